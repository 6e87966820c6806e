use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::core::inference::infer_schema;
use crate::core::schema_builder::{build_schema, check_compatible, WritePolicy};
use crate::core::statement::Statement;
use crate::error::{AppError, Result};
use crate::infra::db::introspect_table;
use crate::models::schema::{TableRef, TableSchema};
use crate::models::source::SourceTable;
use crate::models::value::{coerce, BoundValue};

/// Postgres 单条语句最多 65535 个绑定参数
const MAX_PARAMS: usize = 65_535;
const MAX_ROWS_PER_INSERT: usize = 500;

/// 推断类型 -> 建表 -> 导入数据，返回网关使用的表结构
#[instrument(skip(pool, source, table), fields(table = %table.qualified(), rows = source.row_count()))]
pub async fn ingest(
    pool: &PgPool,
    source: &SourceTable,
    table: &TableRef,
    policy: WritePolicy,
) -> Result<TableSchema> {
    let descriptors = infer_schema(source);
    let plan = build_schema(&descriptors, table, policy)?;

    let mut tx = pool.begin().await?;
    if let Some(drop) = &plan.drop {
        info!("覆盖模式，删除已有数据表");
        sqlx::query(drop).execute(&mut *tx).await?;
    }
    sqlx::query(&plan.create).execute(&mut *tx).await?;
    tx.commit().await?;

    if policy == WritePolicy::Append {
        let existing = introspect_table(pool, table).await?.ok_or_else(|| {
            AppError::Schema(format!("table {} missing after create", table.qualified()))
        })?;
        check_compatible(&existing, &plan.schema)?;
    }

    let inserted = load(pool, &plan.schema, source).await?;
    info!("导入完成，共写入 {} 行", inserted);
    Ok(plan.schema)
}

/// 逐格转换为列类型，第一个失败的单元格会报出行号和列名
fn coerce_rows(schema: &TableSchema, source: &SourceTable) -> Result<Vec<Vec<BoundValue>>> {
    source
        .rows()
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            schema
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    coerce(value, column.inferred_type)
                        .map_err(|reason| AppError::row_mismatch(row_idx, &column.name, reason))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn insert_statements(schema: &TableSchema, rows: Vec<Vec<BoundValue>>) -> Vec<Statement> {
    let width = schema.columns.len().max(1);
    let chunk_rows = (MAX_PARAMS / width).clamp(1, MAX_ROWS_PER_INSERT);

    let mut statements = Vec::new();
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let mut stmt = Statement::new(format!("INSERT INTO {} (", schema.table.qualified()));
        stmt.push_ident_list(schema.columns.iter().map(|c| c.name.as_str()));
        stmt.push_str(") VALUES ");
        for (i, row) in rows.by_ref().take(chunk_rows).enumerate() {
            stmt.push_str(if i == 0 { "(" } else { ", (" });
            for (j, value) in row.into_iter().enumerate() {
                if j > 0 {
                    stmt.push_str(", ");
                }
                stmt.push_param(value);
            }
            stmt.push_str(")");
        }
        statements.push(stmt);
    }
    statements
}

/// 按顺序插入全部源数据行，值按位置绑定。
///
/// 整个导入在一个事务内完成：任一行失败，表保持导入前的状态。
/// 发送任何语句之前会先按列类型校验所有行。
#[instrument(skip_all, fields(table = %schema.table.qualified()))]
pub async fn load(pool: &PgPool, schema: &TableSchema, source: &SourceTable) -> Result<u64> {
    if source.is_empty() {
        warn!("没有可导入的数据行");
        return Ok(0);
    }
    if source.columns().len() != schema.columns.len() {
        return Err(AppError::Load(format!(
            "source has {} columns but the schema defines {}",
            source.columns().len(),
            schema.columns.len()
        )));
    }

    let rows = coerce_rows(schema, source)?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for stmt in insert_statements(schema, rows) {
        inserted += stmt.query().execute(&mut *tx).await?.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}
