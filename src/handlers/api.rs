use axum::Json;
use serde_json::{Value, json};

/// Public health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
