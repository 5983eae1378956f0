//! Welcome and health endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use tracing::warn;

use crate::AppState;

/// `GET /`
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Welcome to Agentmart API" }))
}

/// `GET /health`: app and store status. Always 200; store failures are
/// reported in the body.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    match state.agents.health().await {
        Ok(store) => Json(json!({
            "app_status": "healthy",
            "version": agentmart_core::version(),
            "db_status": "connected",
            "store": store,
        })),
        Err(e) => {
            warn!(error = %e, "health check failed");
            Json(json!({
                "status": "unhealthy",
                "db": "disconnected",
                "error": e.to_string(),
            }))
        }
    }
}
