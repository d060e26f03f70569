//! Password reset flow.
//!
//! `forgot-password` never reveals whether an email is registered: the
//! response is identical either way, and the reset link leaves only through
//! the mailer. Tokens are opaque, single-use, and expire after one hour;
//! only their SHA-256 hash is stored.

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_password, hash_token, ApiContext};
use crate::db::repository::{password_resets, users};

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(rename = "novaSenha")]
    pub nova_senha: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub mensagem: String,
}

/// `POST /api/senha/forgot-password` — issue a reset link if the account
/// exists.
pub async fn forgot_password(
    State(ctx): State<ApiContext>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = {
        let conn = ctx.lock_db();
        users::find_user_by_email(&conn, &email)?
    };

    if let Some(user) = user {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        {
            let conn = ctx.lock_db();
            password_resets::insert_reset(&conn, &hash_token(&token), &user.id, expires_at)?;
        }

        let reset_link = format!(
            "{}/reset-password?token={token}",
            ctx.config.frontend_url
        );
        if let Err(e) = ctx.mailer.send_password_reset(&user.email, &reset_link) {
            // Still answer 200: the response must not leak delivery state.
            tracing::error!(error = %e, "failed to send password reset mail");
        }
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(Json(MessageResponse {
        mensagem: "Se o e-mail estiver cadastrado, você receberá um link de redefinição."
            .to_string(),
    }))
}

/// `POST /api/senha/reset-password` — consume a reset token and set a new
/// password.
pub async fn reset_password(
    State(ctx): State<ApiContext>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.nova_senha.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "a senha deve ter pelo menos {MIN_PASSWORD_LEN} caracteres"
        )));
    }

    let password_hash = hash_password(&payload.nova_senha)
        .map_err(|e| ApiError::Internal(format!("password hashing: {e}")))?;

    let conn = ctx.lock_db();
    let user_id = password_resets::consume_reset(&conn, &hash_token(&payload.token), Utc::now())?
        .ok_or_else(|| ApiError::BadRequest("token inválido ou expirado".into()))?;

    users::update_user_password(&conn, &user_id, &password_hash)?;
    tracing::info!(user_id = %user_id, "password reset completed");

    Ok(Json(MessageResponse {
        mensagem: "Senha redefinida com sucesso.".to_string(),
    }))
}
