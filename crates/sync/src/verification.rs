//! Out-of-band sample-based data verification.
//!
//! Draws an unbiased random sample of at least 1% (minimum one record)
//! of each entity's persisted rows, re-fetches every sampled record
//! from the upstream site, and diffs specific fields. A failed upstream
//! re-fetch excludes the record from the accuracy denominator:
//! verification measures known discrepancies, not upstream
//! availability. Independent of the import pipeline and safe to run
//! concurrently with it.

use std::sync::Arc;

use chrono::Utc;

use clubsync_core::entity::PHASE_ORDER;
use clubsync_core::verification::{
    accuracy_percent, diff_records, sample_size, status_for_accuracy, DiscrepancyDetail,
    DiscrepancySeverity, EntityVerification, OverallVerificationReport, VerificationTrigger,
};
use clubsync_scraper::client::PageFetcher;

use crate::error::SyncError;
use crate::store::{ImportStore, StoredVerificationReport};

/// Reconciles persisted data against the live upstream source.
pub struct VerificationService {
    store: Arc<dyn ImportStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn ImportStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Run a full verification sweep and persist the report.
    pub async fn run(
        &self,
        trigger: VerificationTrigger,
    ) -> Result<OverallVerificationReport, SyncError> {
        let mut entities = Vec::with_capacity(PHASE_ORDER.len());
        let mut total_sampled = 0i64;
        let mut total_compared = 0i64;
        let mut total_matched = 0i64;

        for entity in PHASE_ORDER {
            let total_count = self.store.entity_count(entity).await?;
            let wanted = sample_size(total_count);
            let ids = if wanted > 0 {
                self.store.sample_ext_ids(entity, wanted).await?
            } else {
                Vec::new()
            };

            let mut fetch_failures = 0i64;
            let mut matched = 0i64;
            let mut compared = 0i64;
            let mut discrepancies: Vec<DiscrepancyDetail> = Vec::new();

            for ext_id in &ids {
                let Some(stored) = self.store.stored_record(entity, *ext_id).await? else {
                    // Row vanished between sampling and reading; skip it.
                    continue;
                };

                match self.fetcher.fetch_record(entity, *ext_id).await {
                    Ok(Some(upstream)) => {
                        compared += 1;
                        let diffs = diff_records(&stored, &upstream);
                        if diffs.is_empty() {
                            matched += 1;
                        } else {
                            discrepancies.extend(diffs);
                        }
                    }
                    Ok(None) => {
                        // The record exists locally but is gone upstream:
                        // that is drift, not a fetch failure.
                        compared += 1;
                        discrepancies.push(DiscrepancyDetail {
                            ext_id: *ext_id,
                            field: "presence".to_string(),
                            stored: "present".to_string(),
                            upstream: "missing".to_string(),
                            severity: DiscrepancySeverity::High,
                        });
                    }
                    Err(e) => {
                        tracing::debug!(
                            entity = %entity,
                            ext_id,
                            error = %e,
                            "Re-fetch failed; excluding record from accuracy",
                        );
                        fetch_failures += 1;
                    }
                }
            }

            let sampled = ids.len() as i64;
            let accuracy = accuracy_percent(matched, compared);
            total_sampled += sampled;
            total_compared += compared;
            total_matched += matched;

            entities.push(EntityVerification {
                entity_type: entity,
                total_count,
                sample_size: sampled,
                fetch_failures,
                compared,
                matched_count: matched,
                discrepancies,
                accuracy,
            });
        }

        let overall_accuracy = accuracy_percent(total_matched, total_compared);
        let report = OverallVerificationReport {
            trigger,
            status: status_for_accuracy(overall_accuracy),
            overall_accuracy,
            total_sampled,
            total_compared,
            total_matched,
            entities,
            generated_at: Utc::now(),
        };

        self.store.save_verification_report(&report).await?;

        tracing::info!(
            trigger = trigger.as_str(),
            status = report.status.as_str(),
            overall_accuracy,
            total_sampled,
            "Verification sweep complete",
        );

        Ok(report)
    }

    /// Most recent persisted report.
    pub async fn latest(&self) -> Result<Option<StoredVerificationReport>, SyncError> {
        self.store.latest_verification_report().await
    }

    /// Historical reports, newest first.
    pub async fn history(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredVerificationReport>, SyncError> {
        self.store.verification_history(limit, offset).await
    }
}
