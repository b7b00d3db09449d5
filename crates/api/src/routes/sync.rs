//! Route definitions for the data sync admin surface.
//!
//! Mounted at `/admin/sync` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sync;
use crate::state::AppState;

/// Sync routes.
///
/// ```text
/// POST   /start                    -> start_import
/// GET    /status                   -> get_status
/// POST   /cancel                   -> cancel_import
/// POST   /retry-skipped-pages      -> retry_skipped_pages
/// GET    /skipped-pages            -> list_skipped_pages
/// GET    /runs                     -> list_runs (?limit, offset)
/// GET    /runs/{id}                -> get_run
/// GET    /integrity                -> run_integrity_checks
/// POST   /verification/run         -> run_verification
/// GET    /verification/latest      -> latest_verification
/// GET    /verification/history     -> verification_history (?limit, offset)
/// ```
pub fn sync_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(sync::start_import))
        .route("/status", get(sync::get_status))
        .route("/cancel", post(sync::cancel_import))
        .route("/retry-skipped-pages", post(sync::retry_skipped_pages))
        .route("/skipped-pages", get(sync::list_skipped_pages))
        .route("/runs", get(sync::list_runs))
        .route("/runs/{id}", get(sync::get_run))
        .route("/integrity", get(sync::run_integrity_checks))
        .route("/verification/run", post(sync::run_verification))
        .route("/verification/latest", get(sync::latest_verification))
        .route("/verification/history", get(sync::verification_history))
}
