use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sqlx::{postgres::PgRow, Column, Row, TypeInfo};

/// 目标表的一行记录，列顺序与表定义一致
pub type Record = Map<String, Value>;

/// NUMERIC 以十进制字符串输出，避免经 f64 丢精度
pub fn numeric_to_json(value: Option<Decimal>) -> Value {
    json!(value.map(|d| d.to_string()))
}

/// 按列类型名把 PgRow 转成 JSON 记录。解码失败直接返回错误，不会吞成 null
pub fn pg_row_to_record(row: &PgRow) -> Result<Record, sqlx::Error> {
    let mut map = Map::new();

    for col in row.columns() {
        let name = col.name();
        let idx = col.ordinal();
        let type_info = col.type_info();

        let val = match type_info.name() {
            "INT2" => json!(row.try_get::<Option<i16>, _>(idx)?),
            "INT4" => json!(row.try_get::<Option<i32>, _>(idx)?),
            "INT8" => json!(row.try_get::<Option<i64>, _>(idx)?),
            "FLOAT4" => json!(row.try_get::<Option<f32>, _>(idx)?),
            "FLOAT8" => json!(row.try_get::<Option<f64>, _>(idx)?),
            "NUMERIC" => numeric_to_json(row.try_get(idx)?),
            "BOOL" => json!(row.try_get::<Option<bool>, _>(idx)?),
            "DATE" => {
                let v: Option<NaiveDate> = row.try_get(idx)?;
                json!(v.map(|d| d.to_string()))
            }
            "TIMESTAMP" => {
                let v: Option<NaiveDateTime> = row.try_get(idx)?;
                json!(v.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            }
            "TIMESTAMPTZ" => {
                let v: Option<DateTime<Utc>> = row.try_get(idx)?;
                json!(v.map(|dt| dt.to_rfc3339()))
            }
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?.unwrap_or(Value::Null),
            // TEXT、VARCHAR 及其余能按字符串解码的类型
            _ => json!(row.try_get::<Option<String>, _>(idx)?),
        };

        map.insert(name.to_string(), val);
    }

    Ok(map)
}

/// 从 `RETURNING` 行里取主键
pub fn record_id(record: &Record, key: &str) -> Option<i64> {
    record.get(key).and_then(Value::as_i64)
}
