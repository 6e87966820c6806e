//! 标识符转义与按位置绑定参数。
//!
//! 凡是带有调用方或文件提供的名字的 SQL 都在这里拼接，转义规则只有一处。
//! 值永远不进入 SQL 文本，统一收集为 [`BoundValue`] 并以 `$n` 参数绑定。

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::models::value::BoundValue;

/// 用双引号包裹 Postgres 标识符，内部的双引号加倍
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, Default)]
pub struct Statement {
    sql: String,
    params: Vec<BoundValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn push_str(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    /// 追加 `$n` 占位符并返回占位符名
    pub fn push_param(&mut self, value: BoundValue) -> String {
        self.params.push(value);
        let placeholder = format!("${}", self.params.len());
        self.sql.push_str(&placeholder);
        placeholder
    }

    pub fn push_ident_list<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for (idx, name) in names.into_iter().enumerate() {
            if idx > 0 {
                self.sql.push_str(", ");
            }
            self.push_ident(name);
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[BoundValue] {
        &self.params
    }

    /// 构造 sqlx 查询并按顺序绑定全部参数
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        self.params
            .iter()
            .cloned()
            .fold(sqlx::query(&self.sql), bind_value)
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: BoundValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BoundValue::Integer(v) => query.bind(v),
        BoundValue::Numeric(v) => query.bind(v),
        BoundValue::Text(v) => query.bind(v),
        BoundValue::Boolean(v) => query.bind(v),
        BoundValue::Timestamp(v) => query.bind(v),
        BoundValue::IntegerArray(v) => query.bind(v),
    }
}
