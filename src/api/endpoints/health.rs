//! Health check endpoint.

use axum::Json;
use serde::Serialize;

use crate::config::{APP_VERSION, SERVICE_NAME};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
}

/// `GET /health`: liveness probe. Never touches the LLM backend.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
        version: APP_VERSION,
    })
}
