//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub versao: &'static str,
    /// False when the Gemini credential is absent. Lets an operator spot
    /// the misconfiguration without uploading a receipt.
    pub gemini_configurado: bool,
}

/// `GET /api/health` — liveness check, no auth.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        versao: crate::config::APP_VERSION,
        gemini_configurado: ctx.config.gemini_api_key.is_some(),
    }))
}
