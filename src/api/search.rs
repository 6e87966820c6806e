use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::ax_state::AppState;
use crate::core::predicate::SearchPredicate;
use crate::error::Result;
use crate::infra::utils::Record;
use crate::models::request::{LimitParams, SearchQuery};

/// 按调用方指定的列做等值查询，条件之间用 AND/OR 连接
pub async fn query_by_text(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
    Json(payload): Json<SearchQuery>,
) -> Result<Json<Vec<Record>>> {
    let predicate = SearchPredicate::try_from(payload)?;
    let records = state.gateway.search(&predicate, params.limit).await?;
    Ok(Json(records))
}

/// 单列模糊匹配 (不区分大小写的子串)
pub async fn query_similar(
    State(state): State<Arc<AppState>>,
    Path((column, value)): Path<(String, String)>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Record>>> {
    let records = state.gateway.similar(&column, &value, params.limit).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state as state;
    use crate::error::AppError;
    use serde_json::json;

    fn search_body(value: serde_json::Value) -> SearchQuery {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn search_body_defaults() {
        let body = search_body(json!({"conditions": {"name": "john"}}));
        assert_eq!(body.operator, "AND");
        assert!(!body.case_sensitive);
    }

    #[tokio::test]
    async fn unknown_column_is_a_client_error() {
        let result = query_by_text(
            State(state()),
            Query(LimitParams::default()),
            Json(search_body(json!({"conditions": {"zip": "10001"}}))),
        )
        .await;
        assert!(matches!(result, Err(AppError::Predicate(_))));
    }

    #[tokio::test]
    async fn bad_operator_and_empty_conditions_are_rejected() {
        let bad_operator = query_by_text(
            State(state()),
            Query(LimitParams::default()),
            Json(search_body(json!({"conditions": {"name": "x"}, "operator": "NOT"}))),
        )
        .await;
        assert!(matches!(bad_operator, Err(AppError::Predicate(_))));

        let empty = query_by_text(
            State(state()),
            Query(LimitParams::default()),
            Json(search_body(json!({"conditions": {}}))),
        )
        .await;
        assert!(matches!(empty, Err(AppError::Predicate(_))));
    }

    #[tokio::test]
    async fn limit_out_of_range_is_rejected() {
        let result = query_similar(
            State(state()),
            Path(("name".to_string(), "jo".to_string())),
            Query(LimitParams { limit: Some(101) }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
