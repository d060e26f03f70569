//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, hashes it, looks the hash up in
//! the session store, and injects [`AuthUser`] into request extensions for
//! downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext, AuthUser};
use crate::db::repository::sessions;

/// Require a valid bearer token from a logged-in user.
///
/// Accesses `ApiContext` from request extensions (injected by the Extension
/// layer, which must be outermost).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let user_id = {
        let conn = ctx.lock_db();
        sessions::find_user_by_token(&conn, &hash_token(&token))?
    }; // guard dropped before any .await

    let user_id = user_id.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser { id: user_id });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
