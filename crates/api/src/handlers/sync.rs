//! Handlers for the data sync admin surface.
//!
//! Provides endpoints for starting, observing, cancelling, and
//! repairing imports, plus integrity sweeps and verification reports.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use serde::{Deserialize, Serialize};

use clubsync_core::entity::{EntityType, ImportStrategy, PHASE_ORDER};
use clubsync_core::types::DbId;
use clubsync_core::verification::VerificationTrigger;
use clubsync_sync::integrity;
use clubsync_sync::SyncError;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Upper bound for list endpoints.
const MAX_LIST_LIMIT: i64 = 100;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(25).clamp(1, MAX_LIST_LIMIT)
}

fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

fn parse_entity_type(s: &str) -> AppResult<EntityType> {
    EntityType::from_str(s).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unknown entity type '{s}'. Valid types: {}",
            PHASE_ORDER.map(|e| e.as_str()).join(", ")
        ))
    })
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for starting an import.
#[derive(Debug, Deserialize)]
pub struct StartImportRequest {
    /// `"full"` or one of the entity type names.
    pub strategy: String,
    /// Optional estimate of total records, used for percent progress.
    pub estimated_total: Option<i64>,
}

/// Response body for a started import.
#[derive(Debug, Serialize)]
pub struct StartImportResponse {
    pub import_id: DbId,
}

/// Request body for cancelling an import.
#[derive(Debug, Deserialize)]
pub struct CancelImportRequest {
    pub import_id: DbId,
}

/// Response body acknowledging a cancellation request.
#[derive(Debug, Serialize)]
pub struct CancelImportResponse {
    pub import_id: DbId,
    pub cancellation_requested: bool,
}

/// Request body for retrying skipped pages.
#[derive(Debug, Deserialize)]
pub struct RetrySkippedRequest {
    pub entity_type: String,
    pub page_numbers: Vec<u32>,
}

/// Request body for triggering a verification sweep.
#[derive(Debug, Default, Deserialize)]
pub struct RunVerificationRequest {
    /// `"manual"` (default) or `"scheduled"`.
    pub trigger: Option<String>,
}

/// Query parameters for paginated listings.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Skipped pages for one entity type.
#[derive(Debug, Serialize)]
pub struct SkippedPagesEntry {
    pub entity_type: EntityType,
    pub page_numbers: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Import lifecycle handlers
// ---------------------------------------------------------------------------

/// POST /admin/sync/start
///
/// Start an import in the background. Responds 409 with code
/// `ADVISORY_LOCK_HELD` when another import is already running.
pub async fn start_import(
    State(state): State<AppState>,
    Json(input): Json<StartImportRequest>,
) -> AppResult<impl IntoResponse> {
    let strategy = ImportStrategy::parse(&input.strategy).map_err(AppError::Core)?;

    if let Some(total) = input.estimated_total {
        if total < 0 {
            return Err(AppError::BadRequest(
                "estimated_total must not be negative".to_string(),
            ));
        }
    }

    let import_id = state
        .orchestrator
        .start_import(strategy, input.estimated_total)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StartImportResponse { import_id },
        }),
    ))
}

/// GET /admin/sync/status
///
/// Read-side projection of the current import state for polling.
pub async fn get_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = state.orchestrator.status().await?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /admin/sync/cancel
///
/// Request cooperative cancellation; the run exits at its next batch
/// boundary with a resumable checkpoint.
pub async fn cancel_import(
    State(state): State<AppState>,
    Json(input): Json<CancelImportRequest>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.cancel(input.import_id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: CancelImportResponse {
                import_id: input.import_id,
                cancellation_requested: true,
            },
        }),
    ))
}

/// POST /admin/sync/retry-skipped-pages
///
/// Re-fetch only the listed pages and merge the results.
pub async fn retry_skipped_pages(
    State(state): State<AppState>,
    Json(input): Json<RetrySkippedRequest>,
) -> AppResult<impl IntoResponse> {
    let entity = parse_entity_type(&input.entity_type)?;
    if input.page_numbers.is_empty() {
        return Err(AppError::BadRequest(
            "page_numbers must not be empty".to_string(),
        ));
    }

    let outcome = state
        .orchestrator
        .retry_skipped_pages(entity, &input.page_numbers)
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /admin/sync/skipped-pages
///
/// Skipped pages per entity type, for the retry UI.
pub async fn list_skipped_pages(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut entries = Vec::with_capacity(PHASE_ORDER.len());
    for entity in PHASE_ORDER {
        let page_numbers = state.store.skipped_pages(entity).await?;
        if !page_numbers.is_empty() {
            entries.push(SkippedPagesEntry {
                entity_type: entity,
                page_numbers,
            });
        }
    }
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Run log handlers
// ---------------------------------------------------------------------------

/// GET /admin/sync/runs?limit=&offset=
///
/// Past import runs, newest first.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let runs = state
        .store
        .list_runs(clamp_limit(params.limit), clamp_offset(params.offset))
        .await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /admin/sync/runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let run = state
        .store
        .get_run(id)
        .await?
        .ok_or(SyncError::RunNotFound(id))?;
    Ok(Json(DataResponse { data: run }))
}

// ---------------------------------------------------------------------------
// Integrity and verification handlers
// ---------------------------------------------------------------------------

/// GET /admin/sync/integrity
///
/// Run the orphan-detection battery on demand. Failing checks are
/// reported as warnings; the response is always 200.
pub async fn run_integrity_checks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let summary = integrity::run_checks(state.store.as_ref()).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /admin/sync/verification/run
///
/// Trigger a verification sweep against the live upstream.
pub async fn run_verification(
    State(state): State<AppState>,
    Json(input): Json<RunVerificationRequest>,
) -> AppResult<impl IntoResponse> {
    let trigger = match input.trigger.as_deref() {
        None => VerificationTrigger::Manual,
        Some(s) => VerificationTrigger::from_str(s).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unknown verification trigger '{s}'. Valid triggers: manual, scheduled"
            ))
        })?,
    };

    let report = state.verification.run(trigger).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

/// GET /admin/sync/verification/latest
pub async fn latest_verification(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = state.verification.latest().await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /admin/sync/verification/history?limit=&offset=
pub async fn verification_history(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let reports = state
        .verification
        .history(clamp_limit(params.limit), clamp_offset(params.offset))
        .await?;
    Ok(Json(DataResponse { data: reports }))
}
