//! Repository for the `verification_reports` table (append-only).

use sqlx::PgPool;

use crate::models::verification_report::VerificationReportRow;

/// Column list for verification_reports queries.
const COLUMNS: &str = "id, trigger_type, status, overall_accuracy, report, created_at";

/// Stores data verification reports as immutable audit artifacts.
pub struct VerificationReportRepo;

impl VerificationReportRepo {
    /// Insert a new report, returning the created row.
    pub async fn create(
        pool: &PgPool,
        trigger_type: &str,
        status: &str,
        overall_accuracy: f64,
        report: &serde_json::Value,
    ) -> Result<VerificationReportRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO verification_reports (trigger_type, status, overall_accuracy, report)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VerificationReportRow>(&query)
            .bind(trigger_type)
            .bind(status)
            .bind(overall_accuracy)
            .bind(report)
            .fetch_one(pool)
            .await
    }

    /// The most recent report, if any.
    pub async fn latest(pool: &PgPool) -> Result<Option<VerificationReportRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM verification_reports ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, VerificationReportRow>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Past reports, newest first.
    pub async fn history(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VerificationReportRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM verification_reports
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, VerificationReportRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
