//! Category listing and creation, owner-scoped.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::db::repository::categories;
use crate::models::{Category, TransactionKind};

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub nome: String,
    pub tipo: String,
    pub cor: Option<String>,
}

/// `GET /api/categorias` — all of the owner's categories, in store order.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let conn = ctx.lock_db();
    Ok(Json(categories::list_categories(&conn, &auth.id)?))
}

/// `POST /api/categorias` — create a category for the owner.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let nome = payload.nome.trim();
    if nome.is_empty() {
        return Err(ApiError::BadRequest("nome é obrigatório".into()));
    }

    let kind: TransactionKind = payload
        .tipo
        .parse()
        .map_err(|_| ApiError::BadRequest("tipo deve ser \"receita\" ou \"despesa\"".into()))?;

    let category = Category {
        id: Uuid::new_v4(),
        user_id: auth.id,
        name: nome.to_string(),
        kind,
        color: payload.cor.filter(|c| !c.trim().is_empty()),
    };

    {
        let conn = ctx.lock_db();
        categories::insert_category(&conn, &category)?;
    }

    Ok(Json(category))
}
