use serde_json::{Map, Value};

use crate::models::value::{parse_timestamp, CellValue};

/// 内存中的源数据表，按行存储
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl SourceTable {
    /// 每行的单元格数必须等于列数
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// 由 JSON 对象构造。列顺序按首次出现，缺失的键记为 null。
    /// JSON 没有时间类型，所以非空字符串全部能解析为时间戳的列按时间戳解码。
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let mut rows: Vec<Vec<CellValue>> = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().map(CellValue::from).unwrap_or(CellValue::Null))
                    .collect()
            })
            .collect();

        for idx in 0..columns.len() {
            let timestamps = rows
                .iter()
                .map(|row| &row[idx])
                .filter(|v| !v.is_null())
                .try_fold(false, |_, v| match v {
                    CellValue::Text(s) => parse_timestamp(s).map(|_| true),
                    _ => None,
                });
            if timestamps == Some(true) {
                for row in &mut rows {
                    let parsed = match &row[idx] {
                        CellValue::Text(s) => parse_timestamp(s),
                        _ => None,
                    };
                    if let Some(ts) = parsed {
                        row[idx] = CellValue::Timestamp(ts);
                    }
                }
            }
        }

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |row| &row[index])
    }
}
