//! Transaction listing, owner-scoped, newest first.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::db::repository::transactions;
use crate::models::Transaction;

/// `GET /api/transacoes` — the owner's transactions, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let conn = ctx.lock_db();
    Ok(Json(transactions::list_transactions(&conn, &auth.id)?))
}
