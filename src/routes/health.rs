use axum::Json;
use serde_json::{json, Value};

/// Liveness probe reporting the crate version and which backend answered.
pub async fn health_check(backend: &'static str) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": backend,
    }))
}
