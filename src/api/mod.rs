//! HTTP API.
//!
//! Exposes the receipt pipeline and account features as JSON endpoints for
//! the web frontend. Routes are nested under `/api/`; receipt, category and
//! transaction routes sit behind bearer-token auth.
//!
//! The router is composable — `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use router::api_router;
pub use types::ApiContext;
