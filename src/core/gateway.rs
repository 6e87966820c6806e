//! 导入表上的增删改查与检索。
//!
//! 每个操作先校验并编译语句，再借用连接，在独立事务中只执行一条语句。
//! 成功则提交，出错时事务随 drop 回滚。

use std::sync::Arc;

use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument};

use crate::core::predicate::{compile_into, compile_similar_into, SearchPredicate};
use crate::core::statement::{quote_ident, Statement};
use crate::error::{AppError, Result};
use crate::infra::utils::{pg_row_to_record, record_id, Record};
use crate::models::schema::{TableSchema, PRIMARY_KEY};
use crate::models::value::{coerce, BoundValue, CellValue};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// 补默认值并校验 1..=100 的范围
pub fn resolve_limit(limit: Option<i64>) -> Result<i64> {
    match limit.unwrap_or(DEFAULT_LIMIT) {
        l @ 1..=MAX_LIMIT => Ok(l),
        other => Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, other
        ))),
    }
}

fn check_id(id: i64) -> Result<()> {
    if id < 1 {
        return Err(AppError::Validation(format!("item id must be >= 1, got {}", id)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RecordGateway {
    pool: PgPool,
    schema: Arc<TableSchema>,
}

impl RecordGateway {
    pub fn new(pool: PgPool, schema: TableSchema) -> Self {
        Self {
            pool,
            schema: Arc::new(schema),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn select_all(&self) -> Statement {
        Statement::new(format!("SELECT * FROM {}", self.schema.table.qualified()))
    }

    fn bind_columns(&self, values: &Map<String, Value>) -> Result<Vec<(String, BoundValue)>> {
        values
            .iter()
            .map(|(name, raw)| {
                let column = self.schema.writable_column(name)?;
                let bound = coerce(&CellValue::from(raw.clone()), column.inferred_type)
                    .map_err(|reason| AppError::Validation(format!("column \"{}\": {}", name, reason)))?;
                Ok((name.clone(), bound))
            })
            .collect()
    }

    fn insert_statement(&self, values: &Map<String, Value>) -> Result<Statement> {
        let columns = self.bind_columns(values)?;
        let mut stmt = Statement::new(format!("INSERT INTO {} ", self.schema.table.qualified()));
        if columns.is_empty() {
            stmt.push_str("DEFAULT VALUES");
        } else {
            stmt.push_str("(");
            stmt.push_ident_list(columns.iter().map(|(name, _)| name.as_str()));
            stmt.push_str(") VALUES (");
            for (idx, (_, value)) in columns.into_iter().enumerate() {
                if idx > 0 {
                    stmt.push_str(", ");
                }
                stmt.push_param(value);
            }
            stmt.push_str(")");
        }
        stmt.push_str(" RETURNING *");
        Ok(stmt)
    }

    fn update_statement(&self, id: i64, values: &Map<String, Value>) -> Result<Statement> {
        check_id(id)?;
        if values.is_empty() {
            return Err(AppError::Validation("no columns to update".into()));
        }
        let columns = self.bind_columns(values)?;
        let mut stmt = Statement::new(format!("UPDATE {} SET ", self.schema.table.qualified()));
        for (idx, (name, value)) in columns.into_iter().enumerate() {
            if idx > 0 {
                stmt.push_str(", ");
            }
            stmt.push_ident(&name).push_str(" = ");
            stmt.push_param(value);
        }
        stmt.push_str(" WHERE ").push_ident(PRIMARY_KEY).push_str(" = ");
        stmt.push_param(BoundValue::Integer(Some(id)));
        stmt.push_str(" RETURNING *");
        Ok(stmt)
    }

    fn by_id_statement(&self, id: i64) -> Result<Statement> {
        check_id(id)?;
        let mut stmt = self.select_all();
        stmt.push_str(" WHERE ").push_ident(PRIMARY_KEY).push_str(" = ");
        stmt.push_param(BoundValue::Integer(Some(id)));
        Ok(stmt)
    }

    fn search_statement(&self, predicate: &SearchPredicate, limit: i64) -> Result<Statement> {
        let mut stmt = self.select_all();
        stmt.push_str(" WHERE ");
        compile_into(predicate, &self.schema, &mut stmt)?;
        stmt.push_str(" LIMIT ");
        stmt.push_param(BoundValue::Integer(Some(limit)));
        Ok(stmt)
    }

    fn similar_statement(&self, column: &str, needle: &str, limit: i64) -> Result<Statement> {
        let mut stmt = self.select_all();
        stmt.push_str(" WHERE ");
        compile_similar_into(column, needle, &self.schema, &mut stmt)?;
        stmt.push_str(" LIMIT ");
        stmt.push_param(BoundValue::Integer(Some(limit)));
        Ok(stmt)
    }

    fn delete_statement(&self, ids: &[i64]) -> Statement {
        let key = quote_ident(PRIMARY_KEY);
        let mut stmt = Statement::new(format!(
            "DELETE FROM {} WHERE {} = ANY(",
            self.schema.table.qualified(),
            key
        ));
        stmt.push_param(BoundValue::IntegerArray(ids.to_vec()));
        stmt.push_str(&format!(") RETURNING {}", key));
        stmt
    }

    async fn fetch_all(&self, stmt: &Statement) -> Result<Vec<Record>> {
        debug!(sql = stmt.sql(), params = stmt.params().len(), "执行 SQL");
        let mut tx = self.pool.begin().await?;
        let rows = stmt.query().fetch_all(&mut *tx).await?;
        tx.commit().await?;
        rows.iter()
            .map(|row| pg_row_to_record(row).map_err(AppError::from))
            .collect()
    }

    async fn fetch_optional(&self, stmt: &Statement) -> Result<Option<Record>> {
        debug!(sql = stmt.sql(), params = stmt.params().len(), "执行 SQL");
        let mut tx = self.pool.begin().await?;
        let row = stmt.query().fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        row.as_ref().map(pg_row_to_record).transpose().map_err(AppError::from)
    }

    #[instrument(skip(self, values), fields(columns = values.len()))]
    pub async fn create(&self, values: &Map<String, Value>) -> Result<Record> {
        let stmt = self.insert_statement(values)?;
        let record = self
            .fetch_optional(&stmt)
            .await?
            .ok_or(AppError::Store(sqlx::Error::RowNotFound))?;
        info!("新增记录: id={:?}", record_id(&record, PRIMARY_KEY));
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Record> {
        let stmt = self.by_id_statement(id)?;
        self.fetch_optional(&stmt)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))
    }

    #[instrument(skip(self, predicate), fields(conditions = predicate.conditions.len()))]
    pub async fn search(&self, predicate: &SearchPredicate, limit: Option<i64>) -> Result<Vec<Record>> {
        let stmt = self.search_statement(predicate, resolve_limit(limit)?)?;
        self.fetch_all(&stmt).await
    }

    #[instrument(skip(self))]
    pub async fn similar(&self, column: &str, needle: &str, limit: Option<i64>) -> Result<Vec<Record>> {
        let stmt = self.similar_statement(column, needle, resolve_limit(limit)?)?;
        self.fetch_all(&stmt).await
    }

    #[instrument(skip(self, values), fields(columns = values.len()))]
    pub async fn update(&self, id: i64, values: &Map<String, Value>) -> Result<Record> {
        let stmt = self.update_statement(id, values)?;
        self.fetch_optional(&stmt)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))
    }

    /// 单条语句批量删除，返回实际存在的 id，不存在的直接跳过
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn delete_batch(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let stmt = self.delete_statement(ids);
        let mut tx = self.pool.begin().await?;
        let rows = stmt.query().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let deleted = rows
            .iter()
            .map(|row| row.try_get::<i64, _>(0))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        info!("删除记录: 请求 {} 条，实际删除 {} 条", ids.len(), deleted.len());
        Ok(deleted)
    }

    /// 按存储顺序取前 `limit` 行
    #[instrument(skip(self))]
    pub async fn sample(&self, limit: Option<i64>) -> Result<Vec<Record>> {
        let mut stmt = self.select_all();
        stmt.push_str(" LIMIT ");
        stmt.push_param(BoundValue::Integer(Some(resolve_limit(limit)?)));
        self.fetch_all(&stmt).await
    }
}
