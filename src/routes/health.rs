//! GET /health - Report whether the schedule store is reachable

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use crate::repository::SharedRepository;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health(Extension(repo): Extension<SharedRepository>) -> (StatusCode, Json<Value>) {
    match repo.health_check().await {
        Ok(true) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
