use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Predicate error: {0}")]
    Predicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    /// 批量导入时的行级错误，`row` 从 0 开始计数 (不含表头)
    pub fn row_mismatch(row: usize, column: &str, reason: impl std::fmt::Display) -> Self {
        AppError::Load(format!("row {} column \"{}\": {}", row, column, reason))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Load(_)
            | AppError::Schema(_)
            | AppError::Predicate(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            AppError::Predicate("no conditions".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation("unknown column".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Schema("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_and_store_errors() {
        assert_eq!(
            AppError::NotFound("Item 3".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Store(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_mismatch_names_row_and_column() {
        let err = AppError::row_mismatch(4, "age", "not an integer");
        assert_eq!(
            err.to_string(),
            "Load error: row 4 column \"age\": not an integer"
        );
    }
}
