pub mod link;

use axum::Json;
use serde_json::{json, Value};

/// GET /health, no auth required
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "link-analyser-service up" }))
}
