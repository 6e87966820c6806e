use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::ax_state::AppState;
use crate::error::Result;
use crate::infra::utils::Record;
use crate::models::request::{BatchDeleteRequest, BatchDeleteResponse, LimitParams, UpdateItem};

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Record>>> {
    Ok(Json(state.gateway.sample(params.limit).await?))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<Record>> {
    Ok(Json(state.gateway.get(item_id).await?))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    Ok(Json(state.gateway.create(&payload).await?))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdateItem>,
) -> Result<Json<Record>> {
    Ok(Json(state.gateway.update(item_id, &payload.columns).await?))
}

/// 批量删除，不存在的 id 不会出现在 `deleted_ids` 中
pub async fn delete_items(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>> {
    let deleted_ids = state.gateway.delete_batch(&payload.ids).await?;
    info!("批量删除完成: {:?}", deleted_ids);
    Ok(Json(BatchDeleteResponse { deleted_ids }))
}
