//! Receipt processing endpoints.
//!
//! `POST /api/ocr/processar` runs the full pipeline and persists a
//! transaction; `POST /api/ocr/processar-preview` extracts only. Both expect
//! a multipart form with a single `imagem` file field.
//!
//! The pipeline is synchronous (the Gemini call uses a blocking client), so
//! handlers push it onto the blocking thread pool.

use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::config::MAX_UPLOAD_BYTES;
use crate::models::TransactionKind;
use crate::pipeline::extractor::ExtractedReceipt;
use crate::pipeline::intake::{stage_upload, IntakeError, StagedUpload, UploadField};
use crate::pipeline::materialize::{MaterializeOutcome, TransactionSummary};
use crate::pipeline::orchestrator;

/// Extracted fields as echoed to the frontend.
#[derive(Serialize)]
pub struct ExtractionBody {
    pub texto: String,
    pub valor: Option<f64>,
    pub descricao: Option<String>,
    pub tipo: Option<TransactionKind>,
    pub confianca: f32,
    pub data: Option<NaiveDate>,
}

impl From<ExtractedReceipt> for ExtractionBody {
    fn from(receipt: ExtractedReceipt) -> Self {
        Self {
            texto: receipt.raw_text,
            valor: receipt.amount,
            descricao: receipt.description,
            tipo: receipt.kind,
            confianca: receipt.confidence,
            data: receipt.occurred_on,
        }
    }
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub resultado: ExtractionBody,
    pub transacao: Option<TransactionSummary>,
    pub mensagem: String,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub resultado: ExtractionBody,
}

/// `POST /api/ocr/processar` — extract and create a transaction.
pub async fn processar(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let staged = stage_from_multipart(&ctx, multipart).await?;

    let db = ctx.db.clone();
    let extractor = ctx.extractor.clone();
    let owner_id = user.id;

    let (receipt, outcome) = tokio::task::spawn_blocking(move || {
        orchestrator::run_create(extractor.as_ref(), &db, &owner_id, staged)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))??;

    let (transacao, mensagem) = match outcome {
        MaterializeOutcome::Created(summary) => {
            (Some(summary), "Transação criada com sucesso!".to_string())
        }
        MaterializeOutcome::Skipped => (
            None,
            "Texto extraído, mas nenhum valor válido foi identificado. Nenhuma transação criada."
                .to_string(),
        ),
        MaterializeOutcome::PersistFailed => (
            None,
            "Dados extraídos, mas houve um erro ao salvar a transação.".to_string(),
        ),
    };

    Ok(Json(ProcessResponse {
        success: true,
        resultado: receipt.into(),
        transacao,
        mensagem,
    }))
}

/// `POST /api/ocr/processar-preview` — extract without persisting.
pub async fn processar_preview(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let staged = stage_from_multipart(&ctx, multipart).await?;

    let extractor = ctx.extractor.clone();
    let owner_id = user.id;

    let receipt = tokio::task::spawn_blocking(move || {
        orchestrator::run_preview(extractor.as_ref(), &owner_id, staged)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))??;

    Ok(Json(PreviewResponse {
        success: true,
        resultado: receipt.into(),
    }))
}

async fn stage_from_multipart(
    ctx: &ApiContext,
    multipart: Multipart,
) -> Result<StagedUpload, ApiError> {
    let upload = read_image_field(multipart).await?;
    Ok(stage_upload(&ctx.config.staging_dir, upload, MAX_UPLOAD_BYTES)?)
}

/// Read the `imagem` file field from the multipart request. Other fields are
/// ignored; a request without one is an intake rejection, not a 500.
async fn read_image_field(mut multipart: Multipart) -> Result<UploadField, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("formulário multipart inválido: {e}")))?
    {
        if field.name() != Some("imagem") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let declared_mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("falha ao ler arquivo enviado: {e}")))?
            .to_vec();

        return Ok(UploadField {
            original_name,
            declared_mime,
            bytes,
        });
    }

    Err(IntakeError::NoFile.into())
}
