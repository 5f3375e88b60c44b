//! Liveness endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

pub const BANNER: &str =
    "AI-Powered Medical Report Simplifier Service is running. Use POST /api/simplify.";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
}

/// `GET /`: plain-text banner.
pub async fn banner() -> &'static str {
    BANNER
}

/// `GET /api/health`: does not call any collaborator.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        backend: ctx.backend,
    })
}
