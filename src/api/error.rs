//! API error types with structured JSON responses.
//!
//! Wire shape matches the frontend contract: `{ "error": "...", "detalhes":
//! "..." }`, `detalhes` omitted when there is nothing useful to add.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::extractor::ExtractError;
use crate::pipeline::intake::IntakeError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detalhes: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upload rejected: {0}")]
    Upload(#[from] IntakeError),
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detalhes) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, detail.clone(), None)
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "token de acesso ausente ou inválido".to_string(),
                None,
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "e-mail ou senha incorretos".to_string(),
                None,
            ),
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, detail.clone(), None)
            }
            ApiError::Conflict(detail) => {
                (StatusCode::CONFLICT, detail.clone(), None)
            }
            // A failed staging write is a server problem, not a bad upload.
            ApiError::Upload(IntakeError::Io(e)) => {
                tracing::error!(error = %e, "failed to stage upload");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "erro interno do servidor".to_string(),
                    None,
                )
            }
            ApiError::Upload(err) => {
                (StatusCode::BAD_REQUEST, err.to_string(), None)
            }
            ApiError::Extraction(err) => {
                // Misconfiguration is an operator problem; keep the message
                // diagnosable instead of hiding it behind a generic 500.
                tracing::error!(error = %err, "receipt processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "erro ao processar imagem".to_string(),
                    Some(err.to_string()),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "erro interno do servidor".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody { error, detalhes };
        (status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
