use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::schema::{ColumnDescriptor, ColumnType};
use crate::models::source::SourceTable;
use crate::models::value::{parse_bool, parse_decimal, parse_timestamp, CellValue};

/// 单个非空值的标量类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

fn observe(value: &CellValue) -> Option<Observed> {
    match value {
        CellValue::Null => None,
        CellValue::Float(f) if f.is_nan() => None,
        CellValue::Integer(_) => Some(Observed::Integer),
        // NUMERIC 装不下的浮点数（无穷、超出范围）只能按文本落库
        CellValue::Float(f) if Decimal::from_f64(*f).is_none() => Some(Observed::Text),
        CellValue::Float(_) => Some(Observed::Float),
        CellValue::Boolean(_) => Some(Observed::Boolean),
        CellValue::Timestamp(_) => Some(Observed::Timestamp),
        CellValue::Text(s) => observe_text(s),
    }
}

/// 原始文本按能解析成的类型归类
fn observe_text(raw: &str) -> Option<Observed> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if parse_bool(s).is_some() {
        return Some(Observed::Boolean);
    }
    if s.parse::<i64>().is_ok() {
        return Some(Observed::Integer);
    }
    if parse_decimal(s).is_some() {
        return Some(Observed::Float);
    }
    if parse_timestamp(s).is_some() {
        return Some(Observed::Timestamp);
    }
    Some(Observed::Text)
}

/// 选出能容纳所有非空值的最具体类型。
/// 不会失败：混合、歧义以及全空的列一律回退为 TEXT
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> ColumnType {
    let mut seen: Option<Observed> = None;

    for kind in values.into_iter().filter_map(observe) {
        seen = match (seen, kind) {
            (None, k) => Some(k),
            (Some(a), b) if a == b => Some(a),
            (Some(Observed::Integer), Observed::Float)
            | (Some(Observed::Float), Observed::Integer) => Some(Observed::Float),
            _ => return ColumnType::Text,
        };
    }

    match seen {
        Some(Observed::Integer) => ColumnType::Integer,
        Some(Observed::Float) => ColumnType::Numeric,
        Some(Observed::Boolean) => ColumnType::Boolean,
        Some(Observed::Timestamp) => ColumnType::Timestamp,
        Some(Observed::Text) | None => ColumnType::Text,
    }
}

/// 按源列顺序逐列推断
pub fn infer_schema(source: &SourceTable) -> Vec<ColumnDescriptor> {
    source
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let inferred_type = infer_column_type(source.column_values(idx));
            debug!("列类型推断: \"{}\" -> {:?}", name, inferred_type);
            ColumnDescriptor::new(name.clone(), inferred_type)
        })
        .collect()
}
