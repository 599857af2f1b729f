// src/handlers/mod.rs

pub mod controller;
pub mod events;
pub mod pool;
pub mod room;

use axum::Json;

/// Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
