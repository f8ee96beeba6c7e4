use axum::Json;
use serde_json::{json, Value};

/// Health check (no auth).
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
