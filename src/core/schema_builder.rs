use std::collections::HashMap;

use crate::core::statement::quote_ident;
use crate::error::{AppError, Result};
use crate::models::schema::{ColumnDescriptor, TableRef, TableSchema, PRIMARY_KEY};

/// Postgres 会静默截断超过该字节数的标识符
const MAX_IDENT_BYTES: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// 删除已有表后重建
    #[default]
    Overwrite,
    /// 保留已有表，追加数据
    Append,
}

/// 一次导入所需的 DDL 及其生成的表结构
#[derive(Debug, Clone)]
pub struct SchemaPlan {
    pub drop: Option<String>,
    pub create: String,
    pub schema: TableSchema,
}

/// Postgres 实际存储的标识符：按字符边界截断到 63 字节
fn normalize_ident(name: &str) -> &str {
    if name.len() <= MAX_IDENT_BYTES {
        return name;
    }
    let mut end = MAX_IDENT_BYTES;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn check_columns(descriptors: &[ColumnDescriptor]) -> Result<()> {
    if descriptors.is_empty() {
        return Err(AppError::Schema("no columns to create, no data loaded".into()));
    }
    let mut seen: HashMap<&str, &str> = HashMap::new();
    seen.insert(PRIMARY_KEY, PRIMARY_KEY);

    for column in descriptors {
        if column.name.is_empty() || column.name.contains('\0') {
            return Err(AppError::Schema(format!(
                "invalid column name {:?}",
                column.name
            )));
        }
        let normalized = normalize_ident(&column.name);
        if let Some(previous) = seen.insert(normalized, &column.name) {
            return Err(AppError::Schema(format!(
                "column \"{}\" collides with \"{}\"",
                column.name, previous
            )));
        }
    }
    Ok(())
}

/// 为 `descriptors` 生成 drop/create 语句
pub fn build_schema(
    descriptors: &[ColumnDescriptor],
    table: &TableRef,
    policy: WritePolicy,
) -> Result<SchemaPlan> {
    check_columns(descriptors)?;
    let qualified = table.qualified();

    let drop = match policy {
        WritePolicy::Overwrite => Some(format!("DROP TABLE IF EXISTS {}", qualified)),
        WritePolicy::Append => None,
    };

    let mut definitions = vec![format!("{} BIGSERIAL PRIMARY KEY", quote_ident(PRIMARY_KEY))];
    definitions.extend(
        descriptors
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.inferred_type.sql_type())),
    );
    let create = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified,
        definitions.join(", ")
    );

    Ok(SchemaPlan {
        drop,
        create,
        schema: TableSchema::new(table.clone(), descriptors.to_vec()),
    })
}

/// 追加模式：已有表必须包含每个推断列且类型一致
pub fn check_compatible(existing: &TableSchema, wanted: &TableSchema) -> Result<()> {
    for column in &wanted.columns {
        match existing.column(&column.name) {
            Some(found) if found.inferred_type == column.inferred_type => {}
            Some(found) => {
                return Err(AppError::Schema(format!(
                    "column \"{}\" is {} in {} but the source infers {}",
                    column.name,
                    found.inferred_type.sql_type(),
                    existing.table.qualified(),
                    column.inferred_type.sql_type()
                )))
            }
            None => {
                return Err(AppError::Schema(format!(
                    "column \"{}\" is missing from {}",
                    column.name,
                    existing.table.qualified()
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::ColumnType;

    fn table() -> TableRef {
        TableRef::new("public", "csv_data_table01")
    }

    fn people() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("name", ColumnType::Text),
            ColumnDescriptor::new("age", ColumnType::Integer),
            ColumnDescriptor::new("First Name", ColumnType::Text),
        ]
    }

    #[test]
    fn overwrite_drops_then_creates_with_primary_key_first() {
        let plan = build_schema(&people(), &table(), WritePolicy::Overwrite).unwrap();
        assert_eq!(
            plan.drop.as_deref(),
            Some("DROP TABLE IF EXISTS \"public\".\"csv_data_table01\"")
        );
        assert_eq!(
            plan.create,
            "CREATE TABLE IF NOT EXISTS \"public\".\"csv_data_table01\" (\
             \"_csv_import_id_\" BIGSERIAL PRIMARY KEY, \"name\" TEXT, \"age\" BIGINT, \
             \"First Name\" TEXT)"
        );
        assert_eq!(plan.schema.columns, people());
    }

    #[test]
    fn append_skips_the_drop() {
        let plan = build_schema(&people(), &table(), WritePolicy::Append).unwrap();
        assert!(plan.drop.is_none());
    }

    #[test]
    fn empty_column_set_is_rejected() {
        assert!(matches!(
            build_schema(&[], &table(), WritePolicy::Overwrite),
            Err(AppError::Schema(_))
        ));
    }

    #[test]
    fn colliding_names_are_rejected() {
        let long = "x".repeat(70);
        let columns = vec![
            ColumnDescriptor::new(format!("{}a", long), ColumnType::Text),
            ColumnDescriptor::new(format!("{}b", long), ColumnType::Text),
        ];
        assert!(matches!(
            build_schema(&columns, &table(), WritePolicy::Overwrite),
            Err(AppError::Schema(_))
        ));

        let shadowing_key = vec![ColumnDescriptor::new(PRIMARY_KEY, ColumnType::Integer)];
        assert!(build_schema(&shadowing_key, &table(), WritePolicy::Overwrite).is_err());
    }

    #[test]
    fn case_differences_do_not_collide() {
        let columns = vec![
            ColumnDescriptor::new("Name", ColumnType::Text),
            ColumnDescriptor::new("name", ColumnType::Text),
        ];
        assert!(build_schema(&columns, &table(), WritePolicy::Overwrite).is_ok());
    }

    #[test]
    fn compatibility_requires_matching_types() {
        let existing = TableSchema::new(table(), people());
        let mut wanted = TableSchema::new(table(), people()[..2].to_vec());
        assert!(check_compatible(&existing, &wanted).is_ok());

        wanted.columns[1].inferred_type = ColumnType::Numeric;
        assert!(check_compatible(&existing, &wanted).is_err());

        wanted.columns.push(ColumnDescriptor::new("zip", ColumnType::Text));
        assert!(check_compatible(&existing, &wanted).is_err());
    }

    #[test]
    fn normalize_truncates_on_char_boundary() {
        let name = "é".repeat(40);
        let normalized = normalize_ident(&name);
        assert!(normalized.len() <= MAX_IDENT_BYTES);
        assert_eq!(normalized.chars().count(), 31);
    }
}
