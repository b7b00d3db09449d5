//! Verification report row model.

use clubsync_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `verification_reports` table.
///
/// Append-only audit artifact; `report` holds the full
/// `OverallVerificationReport` as JSON.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VerificationReportRow {
    pub id: DbId,
    pub trigger_type: String,
    pub status: String,
    pub overall_accuracy: f64,
    pub report: serde_json::Value,
    pub created_at: Timestamp,
}
