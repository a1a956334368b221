//! Plain HTTP API handlers.

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
///
/// `GET /health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
