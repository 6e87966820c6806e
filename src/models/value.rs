use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::schema::ColumnType;

/// 单个标量单元格，来自导入文件或 API 调用方
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            Value::String(s) => CellValue::Text(s),
            // 嵌套值按 JSON 文本存储
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }
}

/// 已转换为目标列类型、可直接绑定的值
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Integer(Option<i64>),
    Numeric(Option<Decimal>),
    Text(Option<String>),
    Boolean(Option<bool>),
    Timestamp(Option<NaiveDateTime>),
    IntegerArray(Vec<i64>),
}

impl BoundValue {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            BoundValue::Integer(None)
                | BoundValue::Numeric(None)
                | BoundValue::Text(None)
                | BoundValue::Boolean(None)
                | BoundValue::Timestamp(None)
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, BoundValue::Text(Some(_)))
    }

    fn null_of(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => BoundValue::Integer(None),
            ColumnType::Numeric => BoundValue::Numeric(None),
            ColumnType::Text => BoundValue::Text(None),
            ColumnType::Boolean => BoundValue::Boolean(None),
            ColumnType::Timestamp => BoundValue::Timestamp(None),
        }
    }
}

static TIMESTAMP_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}[-/]\d{2}[-/]\d{2}([ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("timestamp pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// 解析源文件中支持的时间格式，带时区的统一转为 UTC
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if !TIMESTAMP_SHAPE.is_match(s) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// 只接受 `Decimal` 能精确表示的十进制字面量，会被舍入或溢出的值返回 `None`
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    // 先过一遍 f64 语法，排除 "1_000" 这类 Decimal 独有的写法
    s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let d = Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()?;

    let mantissa = s.split(['e', 'E']).next().unwrap_or(s);
    let written: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let kept = d.normalize().mantissa().unsigned_abs().to_string();
    (significant_digits(&written) == significant_digits(&kept)).then_some(d)
}

fn significant_digits(digits: &str) -> &str {
    digits.trim_start_matches('0').trim_end_matches('0')
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// 把 `value` 转换为 `column_type`，失败时返回原因
pub fn coerce(value: &CellValue, column_type: ColumnType) -> Result<BoundValue, String> {
    if value.is_null() {
        return Ok(BoundValue::null_of(column_type));
    }
    let mismatch = || format!("{:?} is not a valid {}", value, column_type.sql_type());

    match column_type {
        ColumnType::Integer => match value {
            CellValue::Integer(i) => Ok(BoundValue::Integer(Some(*i))),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(BoundValue::Integer(Some(*f as i64)))
            }
            CellValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| BoundValue::Integer(Some(i)))
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ColumnType::Numeric => match value {
            CellValue::Integer(i) => Ok(BoundValue::Numeric(Some(Decimal::from(*i)))),
            CellValue::Float(f) => Decimal::from_f64(*f)
                .map(|d| BoundValue::Numeric(Some(d)))
                .ok_or_else(mismatch),
            CellValue::Text(s) => parse_decimal(s)
                .map(|d| BoundValue::Numeric(Some(d)))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::Text => {
            let text = match value {
                CellValue::Text(s) => s.clone(),
                CellValue::Integer(i) => i.to_string(),
                CellValue::Float(f) => f.to_string(),
                CellValue::Boolean(b) => b.to_string(),
                CellValue::Timestamp(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
                CellValue::Null => unreachable!("nulls handled above"),
            };
            Ok(BoundValue::Text(Some(text)))
        }
        ColumnType::Boolean => match value {
            CellValue::Boolean(b) => Ok(BoundValue::Boolean(Some(*b))),
            CellValue::Text(s) => parse_bool(s)
                .map(|b| BoundValue::Boolean(Some(b)))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::Timestamp => match value {
            CellValue::Timestamp(t) => Ok(BoundValue::Timestamp(Some(*t))),
            CellValue::Text(s) => parse_timestamp(s)
                .map(|t| BoundValue::Timestamp(Some(t)))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
    }
}
