//! HTTP routes. The only endpoint is an unauthenticated health probe.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Build the service router.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

/// Health check handler returning a static body.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "murmur-sync",
    }))
}
