//! Registration, login and session introspection.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    generate_token, hash_password, hash_token, verify_password, ApiContext, AuthUser,
};
use crate::db::repository::{sessions, users};
use crate::models::User;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub nome: String,
    pub email: String,
    pub senha: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub senha: String,
}

#[derive(Serialize)]
pub struct UserBody {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nome: user.name,
            email: user.email,
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub usuario: UserBody,
}

/// `POST /api/auth/registrar` — create an account and start a session.
pub async fn registrar(
    State(ctx): State<ApiContext>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let nome = payload.nome.trim();
    let email = normalize_email(&payload.email);

    if nome.is_empty() {
        return Err(ApiError::BadRequest("nome é obrigatório".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("e-mail inválido".into()));
    }
    if payload.senha.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "a senha deve ter pelo menos {MIN_PASSWORD_LEN} caracteres"
        )));
    }

    let password_hash = hash_password(&payload.senha)
        .map_err(|e| ApiError::Internal(format!("password hashing: {e}")))?;

    let user = User {
        id: Uuid::new_v4(),
        name: nome.to_string(),
        email: email.clone(),
        password_hash,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let token = generate_token();
    {
        let conn = ctx.lock_db();
        if users::find_user_by_email(&conn, &email)?.is_some() {
            return Err(ApiError::Conflict("e-mail já cadastrado".into()));
        }
        users::insert_user(&conn, &user)?;
        sessions::insert_session(&conn, &hash_token(&token), &user.id)?;
    }

    tracing::info!(user_id = %user.id, "new account registered");

    Ok(Json(SessionResponse {
        token,
        usuario: user.into(),
    }))
}

/// `POST /api/auth/login` — verify credentials and start a session.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let user = {
        let conn = ctx.lock_db();
        users::find_user_by_email(&conn, &email)?
    };
    // Same rejection for unknown email and wrong password.
    let user = user.ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.senha, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = generate_token();
    {
        let conn = ctx.lock_db();
        sessions::insert_session(&conn, &hash_token(&token), &user.id)?;
    }

    tracing::info!(user_id = %user.id, "login");

    Ok(Json(SessionResponse {
        token,
        usuario: user.into(),
    }))
}

/// `POST /api/auth/logout` — end the current session. Idempotent: an
/// already-removed token still answers 200.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Auth middleware already validated this token; re-read it to know
    // which session row to drop.
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    {
        let conn = ctx.lock_db();
        sessions::delete_session(&conn, &hash_token(token))?;
    }

    Ok(Json(serde_json::json!({ "mensagem": "Sessão encerrada." })))
}

/// `GET /api/auth/me` — identify the session's owner.
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserBody>, ApiError> {
    let user = {
        let conn = ctx.lock_db();
        users::find_user_by_id(&conn, &auth.id)?
    };

    user.map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::NotFound("usuário não encontrado".into()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
