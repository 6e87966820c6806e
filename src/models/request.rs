use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub conditions: Map<String, Value>,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_operator() -> String {
    "AND".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    pub columns: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub deleted_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
