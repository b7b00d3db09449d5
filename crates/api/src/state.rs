use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: clubsync_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The import orchestrator (single instance per process).
    pub orchestrator: Arc<clubsync_sync::ImportOrchestrator>,
    /// Sample-based data verification service.
    pub verification: Arc<clubsync_sync::VerificationService>,
    /// Store handle for read-side queries that bypass the orchestrator.
    pub store: Arc<dyn clubsync_sync::ImportStore>,
}
