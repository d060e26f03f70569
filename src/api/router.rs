//! API router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//! Receipt, category and transaction routes require bearer auth; account
//! and password-reset routes are public.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer). Endpoint handlers use `State<ApiContext>` via `with_state`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;

/// Headroom over the upload ceiling for multipart framing and text fields.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the API router. The returned `Router` can be mounted on any axum
/// server instance.
pub fn api_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route("/ocr/processar", post(endpoints::ocr::processar))
        .route(
            "/ocr/processar-preview",
            post(endpoints::ocr::processar_preview),
        )
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route(
            "/categorias",
            get(endpoints::categories::list).post(endpoints::categories::create),
        )
        .route("/transacoes", get(endpoints::transactions::list))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so the middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/registrar", post(endpoints::auth::registrar))
        .route("/auth/login", post(endpoints::auth::login))
        .route(
            "/senha/forgot-password",
            post(endpoints::password::forgot_password),
        )
        .route(
            "/senha/reset-password",
            post(endpoints::password::reset_password),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + BODY_LIMIT_SLACK))
        .layer(CorsLayer::permissive())
}
