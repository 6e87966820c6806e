use serde::Serialize;

use crate::core::statement::quote_ident;
use crate::error::{AppError, Result};

/// 每张导入表都会注入的自增主键
pub const PRIMARY_KEY: &str = "_csv_import_id_";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Numeric,
    Text,
    Timestamp,
    Boolean,
}

impl ColumnType {
    /// 生成 DDL 时使用的 Postgres 类型，INTEGER 一律用 64 位
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// `information_schema.columns.data_type` 反查推断类型
    pub fn from_pg_data_type(data_type: &str) -> Self {
        match data_type.to_lowercase().as_str() {
            "smallint" | "integer" | "bigint" => ColumnType::Integer,
            "numeric" | "real" | "double precision" => ColumnType::Numeric,
            "boolean" => ColumnType::Boolean,
            "date" | "timestamp without time zone" | "timestamp with time zone" => {
                ColumnType::Timestamp
            }
            _ => ColumnType::Text,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub inferred_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, inferred_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

/// 目标表结构：主键 + 按源顺序排列的数据列
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: TableRef,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn new(table: TableRef, columns: Vec<ColumnDescriptor>) -> Self {
        Self { table, columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 校验调用方给出的列名，主键不可写
    pub fn writable_column(&self, name: &str) -> Result<&ColumnDescriptor> {
        if name == PRIMARY_KEY {
            return Err(AppError::Validation(format!(
                "column \"{}\" is system-generated and cannot be set",
                PRIMARY_KEY
            )));
        }
        self.column(name).ok_or_else(|| {
            AppError::Validation(format!(
                "unknown column \"{}\" for table {}",
                name,
                self.table.qualified()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TableSchema {
        TableSchema::new(
            TableRef::new("public", "people"),
            vec![
                ColumnDescriptor::new("name", ColumnType::Text),
                ColumnDescriptor::new("age", ColumnType::Integer),
            ],
        )
    }

    #[test]
    fn qualified_name_quotes_both_parts() {
        assert_eq!(
            TableRef::new("staging", "Csv Data").qualified(),
            "\"staging\".\"Csv Data\""
        );
    }

    #[test]
    fn writable_column_rejects_unknown_and_primary_key() {
        let schema = people();
        assert!(schema.writable_column("age").is_ok());
        assert!(matches!(
            schema.writable_column("Age"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            schema.writable_column(PRIMARY_KEY),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn pg_data_types_round_back() {
        assert_eq!(ColumnType::from_pg_data_type("bigint"), ColumnType::Integer);
        assert_eq!(
            ColumnType::from_pg_data_type("timestamp without time zone"),
            ColumnType::Timestamp
        );
        assert_eq!(ColumnType::from_pg_data_type("jsonb"), ColumnType::Text);
    }
}
