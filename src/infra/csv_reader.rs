use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::source::SourceTable;
use crate::models::value::CellValue;

/// 空表头改名为 `column_<n>`，重复表头依次改为 `name.1`、`name.2` ...
fn dedupe_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers: Vec<String> = Vec::new();
    for (idx, header) in raw.enumerate() {
        let base = match header.trim() {
            "" => format!("column_{}", idx),
            h => h.to_string(),
        };
        let mut name = base.clone();
        while headers.contains(&name) {
            let n = counts.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{}.{}", base, n);
        }
        headers.push(name);
    }
    headers
}

fn cell(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// 读取带表头的分隔文本文件，生成 [`SourceTable`]。
/// 单元格保持原始文本，空单元格记为 null
pub fn read_csv(path: &Path, delimiter: u8) -> Result<SourceTable> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::Load(format!("CSV file not found: {}", path.display()))
        }
        _ => AppError::Load(format!("cannot open {}: {}", path.display(), e)),
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(file);

    let raw_headers = rdr
        .headers()
        .map_err(|e| AppError::Load(format!("error parsing CSV file: {}", e)))?
        .clone();
    if raw_headers.is_empty() {
        return Err(AppError::Load(format!("CSV file is empty: {}", path.display())));
    }
    let columns = dedupe_headers(raw_headers.iter().map(str::to_string));

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::Load(format!("error parsing CSV file at data row {}: {}", idx, e))
        })?;
        rows.push(record.iter().map(cell).collect::<Vec<_>>());
    }
    if rows.is_empty() {
        return Err(AppError::Load(format!(
            "CSV file has no data rows: {}",
            path.display()
        )));
    }

    info!(
        "CSV 读取完成: {} 行 x {} 列, 文件 {}",
        rows.len(),
        columns.len(),
        path.display()
    );
    Ok(SourceTable::new(columns, rows))
}
