//! Route definitions.

pub mod health;
pub mod sync;

use axum::Router;

use crate::state::AppState;

/// All API v1 routes, mounted under `/api/v1` by `main`.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/admin/sync", sync::sync_router())
}
