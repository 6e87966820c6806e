use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

use crate::error::Result;
use crate::infra::config::AppConfig;
use crate::models::schema::{ColumnDescriptor, ColumnType, TableRef, TableSchema, PRIMARY_KEY};

pub async fn init_pool(config: &AppConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.connect_options.clone())
        .await?;
    info!(
        "Postgres 连接池已建立: {}:{}",
        config.connect_options.get_host(),
        config.connect_options.get_port()
    );
    Ok(pool)
}

/// 读取已有表的数据列，表不存在时返回 `None`
pub async fn introspect_table(pool: &PgPool, table: &TableRef) -> Result<Option<TableSchema>> {
    let rows = sqlx::query(
        "SELECT column_name::text AS column_name, data_type::text AS data_type
         FROM information_schema.columns
         WHERE table_schema = $1 AND table_name = $2
         ORDER BY ordinal_position",
    )
    .bind(&table.schema)
    .bind(&table.table)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("column_name")?;
        if name == PRIMARY_KEY {
            continue;
        }
        let data_type: String = row.try_get("data_type")?;
        columns.push(ColumnDescriptor::new(
            name,
            ColumnType::from_pg_data_type(&data_type),
        ));
    }
    Ok(Some(TableSchema::new(table.clone(), columns)))
}
