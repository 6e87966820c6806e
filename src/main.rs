mod api;
mod core;
mod error;
mod infra;
mod models;

#[cfg(test)]
mod store_tests;

use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::items::{create_item, delete_items, get_item, list_items, update_item};
use crate::api::search::{query_by_text, query_similar};
use crate::core::gateway::RecordGateway;
use crate::error::AppError;
use crate::infra::config::AppConfig;
use crate::infra::{csv_reader, db, ingest};

pub mod ax_state {
    use super::*;
    pub struct AppState {
        pub gateway: RecordGateway,
    }
}

fn router(state: Arc<ax_state::AppState>) -> Router {
    Router::new()
        .route("/query_by_text", post(query_by_text))
        .route("/query_similar/{column}/{value}", get(query_similar))
        .route("/items", get(list_items).post(create_item).delete(delete_items))
        .route("/items/{item_id}", get(get_item).put(update_item))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config).await?;

    // 导入完成后才开始对外提供服务
    let schema = match &config.csv_path {
        Some(path) => {
            let source = csv_reader::read_csv(path, config.delimiter)?;
            ingest::ingest(&pool, &source, &config.table, config.policy).await?
        }
        None => db::introspect_table(&pool, &config.table)
            .await?
            .ok_or_else(|| {
                AppError::Config(format!(
                    "table {} does not exist and CSV_PATH is not set",
                    config.table.qualified()
                ))
            })?,
    };

    let gateway = RecordGateway::new(pool, schema);
    info!(
        "数据表 {} 已就绪，共 {} 个数据列",
        gateway.schema().table.qualified(),
        gateway.schema().columns.len()
    );
    let state = Arc::new(ax_state::AppState { gateway });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("🚀 CSV Gateway 运行在 http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
