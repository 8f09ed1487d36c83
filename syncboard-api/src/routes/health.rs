/// Health check endpoint
///
/// `GET /health` - public, no authentication. Used by load balancers and
/// deployment tooling.

use axum::Json;
use serde_json::{json, Value};

/// Returns service status and version.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
