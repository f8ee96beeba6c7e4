pub mod answers;
pub mod documents;
pub mod health;
pub mod images;
pub mod inspections;

use serde_json::{json, Value};

/// Success envelope: `{ message, data, pagination? }`.
pub fn success(message: &str, data: Value) -> Value {
    json!({ "message": message, "data": data })
}

pub fn success_paginated(message: &str, data: Value, page: i64, limit: i64) -> Value {
    json!({
        "message": message,
        "data": data,
        "pagination": { "page": page, "limit": limit },
    })
}
