//! 把调用方的检索条件编译为参数化的 WHERE 片段

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::core::statement::Statement;
use crate::error::{AppError, Result};
use crate::models::request::SearchQuery;
use crate::models::schema::TableSchema;
use crate::models::value::{coerce, BoundValue, CellValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

impl FromStr for Combinator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            other => Err(AppError::Predicate(format!(
                "unsupported operator \"{}\", expected AND or OR",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchPredicate {
    pub conditions: Map<String, Value>,
    pub combinator: Combinator,
    pub case_sensitive: bool,
}

impl TryFrom<SearchQuery> for SearchPredicate {
    type Error = AppError;

    fn try_from(query: SearchQuery) -> Result<Self> {
        Ok(Self {
            combinator: query.operator.parse()?,
            conditions: query.conditions,
            case_sensitive: query.case_sensitive,
        })
    }
}

/// 把 `predicate` 对应的 WHERE 片段追加到 `stmt`，每个比较绑定一个参数。
///
/// 不区分大小写时文本两侧都套 `LOWER`；null 编译为 `IS NULL`，不绑定参数。
pub fn compile_into(
    predicate: &SearchPredicate,
    schema: &TableSchema,
    stmt: &mut Statement,
) -> Result<()> {
    if predicate.conditions.is_empty() {
        return Err(AppError::Predicate("no search conditions provided".into()));
    }

    // 先全部解析完再写语句，列名有误时 stmt 保持不变
    let mut comparisons = Vec::with_capacity(predicate.conditions.len());
    for (column, raw) in &predicate.conditions {
        let descriptor = schema.column(column).ok_or_else(|| {
            AppError::Predicate(format!("unknown column \"{}\" in search conditions", column))
        })?;
        let value = coerce(&CellValue::from(raw.clone()), descriptor.inferred_type)
            .map_err(|reason| AppError::Predicate(format!("column \"{}\": {}", column, reason)))?;
        comparisons.push((column.as_str(), value));
    }

    stmt.push_str("(");
    for (idx, (column, value)) in comparisons.into_iter().enumerate() {
        if idx > 0 {
            stmt.push_str(predicate.combinator.keyword());
        }
        if value.is_null() {
            stmt.push_ident(column).push_str(" IS NULL");
        } else if value.is_text() && !predicate.case_sensitive {
            stmt.push_str("LOWER(").push_ident(column).push_str(") = LOWER(");
            stmt.push_param(value);
            stmt.push_str(")");
        } else {
            stmt.push_ident(column).push_str(" = ");
            stmt.push_param(value);
        }
    }
    stmt.push_str(")");
    Ok(())
}

/// 独立片段：`sql()` 为条件子句，`params()` 对应 `$1..$n`
pub fn compile(predicate: &SearchPredicate, schema: &TableSchema) -> Result<Statement> {
    let mut stmt = Statement::default();
    compile_into(predicate, schema, &mut stmt)?;
    Ok(stmt)
}

/// 转义 LIKE 通配符，按字面匹配
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// 单列不区分大小写的子串匹配，先转为文本，任意列类型都可用
pub fn compile_similar_into(
    column: &str,
    needle: &str,
    schema: &TableSchema,
    stmt: &mut Statement,
) -> Result<()> {
    if schema.column(column).is_none() {
        return Err(AppError::Predicate(format!(
            "unknown column \"{}\" for similarity search",
            column
        )));
    }
    stmt.push_str("CAST(")
        .push_ident(column)
        .push_str(" AS TEXT) ILIKE ");
    stmt.push_param(BoundValue::Text(Some(format!("%{}%", escape_like(needle)))));
    stmt.push_str(" ESCAPE '\\'");
    Ok(())
}
