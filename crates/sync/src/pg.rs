//! Postgres-backed [`ImportStore`] implementation.
//!
//! Thin delegation to the repository layer in `clubsync-db`; all
//! SQL lives there. Entity dispatch is a straight match over
//! [`EntityType`].

use async_trait::async_trait;

use clubsync_core::entity::{EntityType, ImportStrategy};
use clubsync_core::import::{Checkpoint, ImportStatus};
use clubsync_core::record::ScrapedRecord;
use clubsync_core::types::{DbId, Timestamp};
use clubsync_core::validation::ValidationMetrics;
use clubsync_core::verification::OverallVerificationReport;
use clubsync_db::models::import_run::ImportRun;
use clubsync_db::repositories::{
    AdvisoryLockRepo, CheckpointRepo, ClubRepo, GameRepo, ImportRunRepo, PlayerRepo,
    RateLimitRepo, SkippedPageRepo, TournamentRepo, TournamentResultRepo,
    VerificationReportRepo, YearStatsRepo,
};
use clubsync_db::DbPool;

use crate::error::SyncError;
use crate::integrity::IntegrityCheck;
use crate::store::{ImportStore, RunProgress, RunSnapshot, StoredVerificationReport};

/// Advisory lock key for the system-wide import mutex.
const IMPORT_LOCK_KEY: &str = "import";

/// Production store backed by the Postgres repositories.
pub struct PgImportStore {
    pool: DbPool,
    lock_ttl_secs: i64,
}

impl PgImportStore {
    /// `lock_ttl_secs` bounds how long a crashed holder can keep the
    /// advisory lock before it is reclaimable.
    pub fn new(pool: DbPool, lock_ttl_secs: i64) -> Self {
        Self {
            pool,
            lock_ttl_secs,
        }
    }
}

fn snapshot_from_row(row: ImportRun) -> Result<RunSnapshot, SyncError> {
    let status = ImportStatus::from_str(&row.status)
        .ok_or_else(|| SyncError::Store(format!("Unknown import status '{}'", row.status)))?;

    Ok(RunSnapshot {
        id: row.id,
        strategy: row.strategy,
        status,
        progress_percent: row.progress_percent,
        processed_records: row.processed_records,
        total_records: row.total_records,
        metrics: ValidationMetrics {
            total_fetched: row.total_fetched.max(0) as u64,
            valid_records: row.valid_records.max(0) as u64,
            invalid_records: row.invalid_records.max(0) as u64,
        },
        current_operation: row.current_operation,
        last_error: row.last_error,
        started_at: row.started_at,
        finished_at: row.finished_at,
    })
}

#[async_trait]
impl ImportStore for PgImportStore {
    // -- advisory lock ------------------------------------------------------

    async fn acquire_lock(&self, holder: &str) -> Result<bool, SyncError> {
        Ok(AdvisoryLockRepo::acquire(&self.pool, IMPORT_LOCK_KEY, holder, self.lock_ttl_secs)
            .await?)
    }

    async fn release_lock(&self) -> Result<(), SyncError> {
        Ok(AdvisoryLockRepo::release(&self.pool, IMPORT_LOCK_KEY).await?)
    }

    // -- checkpoint ---------------------------------------------------------

    async fn read_checkpoint(&self) -> Result<Option<Checkpoint>, SyncError> {
        let Some(row) = CheckpointRepo::read(&self.pool).await? else {
            return Ok(None);
        };
        let phase = EntityType::from_str(&row.phase)
            .ok_or_else(|| SyncError::Store(format!("Unknown checkpoint phase '{}'", row.phase)))?;
        Ok(Some(Checkpoint {
            phase,
            batch_index: row.batch_index.max(0) as u32,
            last_processed_id: row.last_processed_id,
            progress_percent: row.progress_percent,
        }))
    }

    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SyncError> {
        Ok(CheckpointRepo::write(
            &self.pool,
            checkpoint.phase.as_str(),
            checkpoint.batch_index as i32,
            checkpoint.last_processed_id,
            checkpoint.progress_percent,
        )
        .await?)
    }

    async fn clear_checkpoint(&self) -> Result<(), SyncError> {
        Ok(CheckpointRepo::clear(&self.pool).await?)
    }

    // -- import runs --------------------------------------------------------

    async fn create_run(
        &self,
        strategy: &ImportStrategy,
        total_records: Option<i64>,
    ) -> Result<DbId, SyncError> {
        let run = ImportRunRepo::create(&self.pool, strategy.as_str(), total_records).await?;
        Ok(run.id)
    }

    async fn set_run_status(
        &self,
        run_id: DbId,
        status: ImportStatus,
        last_error: Option<&str>,
    ) -> Result<(), SyncError> {
        ImportRunRepo::set_status(&self.pool, run_id, status.as_str(), last_error).await?;
        Ok(())
    }

    async fn update_run_progress(
        &self,
        run_id: DbId,
        progress: &RunProgress,
    ) -> Result<(), SyncError> {
        ImportRunRepo::update_progress(
            &self.pool,
            run_id,
            progress.processed_records,
            progress.progress_percent,
            progress.total_records,
            &progress.current_operation,
            progress.metrics.total_fetched as i64,
            progress.metrics.valid_records as i64,
            progress.metrics.invalid_records as i64,
        )
        .await?;
        Ok(())
    }

    async fn get_run(&self, run_id: DbId) -> Result<Option<RunSnapshot>, SyncError> {
        ImportRunRepo::find_by_id(&self.pool, run_id)
            .await?
            .map(snapshot_from_row)
            .transpose()
    }

    async fn latest_run(&self) -> Result<Option<RunSnapshot>, SyncError> {
        ImportRunRepo::latest(&self.pool)
            .await?
            .map(snapshot_from_row)
            .transpose()
    }

    async fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<RunSnapshot>, SyncError> {
        ImportRunRepo::list(&self.pool, limit, offset)
            .await?
            .into_iter()
            .map(snapshot_from_row)
            .collect()
    }

    // -- entity persistence -------------------------------------------------

    async fn upsert_batch(
        &self,
        entity: EntityType,
        records: &[ScrapedRecord],
    ) -> Result<u64, SyncError> {
        let mut written = 0u64;
        for record in records {
            match record {
                ScrapedRecord::Club(r) => ClubRepo::upsert(&self.pool, r).await?,
                ScrapedRecord::Player(r) => PlayerRepo::upsert(&self.pool, r).await?,
                ScrapedRecord::Tournament(r) => TournamentRepo::upsert(&self.pool, r).await?,
                ScrapedRecord::Game(r) => GameRepo::upsert(&self.pool, r).await?,
                ScrapedRecord::YearStats(r) => YearStatsRepo::upsert(&self.pool, r).await?,
                ScrapedRecord::TournamentResult(r) => {
                    TournamentResultRepo::upsert(&self.pool, r).await?
                }
            }
            written += 1;
        }
        if written > 0 {
            tracing::debug!(entity = %entity, written, "Batch upserted");
        }
        Ok(written)
    }

    async fn entity_count(&self, entity: EntityType) -> Result<i64, SyncError> {
        let count = match entity {
            EntityType::Club => ClubRepo::count(&self.pool).await?,
            EntityType::Player => PlayerRepo::count(&self.pool).await?,
            EntityType::Tournament => TournamentRepo::count(&self.pool).await?,
            EntityType::Game => GameRepo::count(&self.pool).await?,
            EntityType::YearStats => YearStatsRepo::count(&self.pool).await?,
            EntityType::TournamentResult => TournamentResultRepo::count(&self.pool).await?,
        };
        Ok(count)
    }

    async fn sample_ext_ids(&self, entity: EntityType, n: i64) -> Result<Vec<i64>, SyncError> {
        let ids = match entity {
            EntityType::Club => ClubRepo::sample_ext_ids(&self.pool, n).await?,
            EntityType::Player => PlayerRepo::sample_ext_ids(&self.pool, n).await?,
            EntityType::Tournament => TournamentRepo::sample_ext_ids(&self.pool, n).await?,
            EntityType::Game => GameRepo::sample_ext_ids(&self.pool, n).await?,
            EntityType::YearStats => YearStatsRepo::sample_ext_ids(&self.pool, n).await?,
            EntityType::TournamentResult => {
                TournamentResultRepo::sample_ext_ids(&self.pool, n).await?
            }
        };
        Ok(ids)
    }

    async fn stored_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, SyncError> {
        let record = match entity {
            EntityType::Club => ClubRepo::find_by_ext_id(&self.pool, ext_id)
                .await?
                .map(|row| ScrapedRecord::Club(row.into())),
            EntityType::Player => PlayerRepo::find_by_ext_id(&self.pool, ext_id)
                .await?
                .map(|row| ScrapedRecord::Player(row.into())),
            EntityType::Tournament => TournamentRepo::find_by_ext_id(&self.pool, ext_id)
                .await?
                .map(|row| ScrapedRecord::Tournament(row.into())),
            EntityType::Game => GameRepo::find_by_ext_id(&self.pool, ext_id)
                .await?
                .map(|row| ScrapedRecord::Game(row.into())),
            EntityType::YearStats => YearStatsRepo::find_by_ext_id(&self.pool, ext_id)
                .await?
                .map(|row| ScrapedRecord::YearStats(row.into())),
            EntityType::TournamentResult => {
                TournamentResultRepo::find_by_ext_id(&self.pool, ext_id)
                    .await?
                    .map(|row| ScrapedRecord::TournamentResult(row.into()))
            }
        };
        Ok(record)
    }

    async fn orphan_counts(&self) -> Result<Vec<(IntegrityCheck, i64)>, SyncError> {
        Ok(vec![
            (
                IntegrityCheck::PlayersClub,
                PlayerRepo::count_orphaned_club_refs(&self.pool).await?,
            ),
            (
                IntegrityCheck::GamesPlayers,
                GameRepo::count_orphaned_player_refs(&self.pool).await?,
            ),
            (
                IntegrityCheck::GamesTournament,
                GameRepo::count_orphaned_tournament_refs(&self.pool).await?,
            ),
            (
                IntegrityCheck::YearStatsPlayer,
                YearStatsRepo::count_orphaned_player_refs(&self.pool).await?,
            ),
            (
                IntegrityCheck::ResultsTournament,
                TournamentResultRepo::count_orphaned_tournament_refs(&self.pool).await?,
            ),
            (
                IntegrityCheck::ResultsPlayer,
                TournamentResultRepo::count_orphaned_player_refs(&self.pool).await?,
            ),
        ])
    }

    // -- skipped pages ------------------------------------------------------

    async fn record_skipped_page(
        &self,
        entity: EntityType,
        page: u32,
        reason: &str,
    ) -> Result<(), SyncError> {
        Ok(SkippedPageRepo::record(&self.pool, entity.as_str(), page as i32, reason).await?)
    }

    async fn skipped_pages(&self, entity: EntityType) -> Result<Vec<u32>, SyncError> {
        let pages = SkippedPageRepo::pages_for_entity(&self.pool, entity.as_str()).await?;
        Ok(pages.into_iter().map(|p| p.max(0) as u32).collect())
    }

    async fn clear_skipped_page(&self, entity: EntityType, page: u32) -> Result<(), SyncError> {
        Ok(SkippedPageRepo::remove(&self.pool, entity.as_str(), page as i32).await?)
    }

    // -- rate limiting ------------------------------------------------------

    async fn increment_rate_bucket(
        &self,
        bucket: &str,
        window_ms: u64,
    ) -> Result<(u32, Timestamp), SyncError> {
        let (count, window_start) =
            RateLimitRepo::increment(&self.pool, bucket, window_ms, chrono::Utc::now()).await?;
        Ok((count.max(0) as u32, window_start))
    }

    // -- verification reports -----------------------------------------------

    async fn save_verification_report(
        &self,
        report: &OverallVerificationReport,
    ) -> Result<DbId, SyncError> {
        let json = serde_json::to_value(report)
            .map_err(|e| SyncError::Store(format!("Failed to serialize report: {e}")))?;
        let row = VerificationReportRepo::create(
            &self.pool,
            report.trigger.as_str(),
            report.status.as_str(),
            report.overall_accuracy,
            &json,
        )
        .await?;
        Ok(row.id)
    }

    async fn latest_verification_report(
        &self,
    ) -> Result<Option<StoredVerificationReport>, SyncError> {
        let Some(row) = VerificationReportRepo::latest(&self.pool).await? else {
            return Ok(None);
        };
        let report: OverallVerificationReport = serde_json::from_value(row.report)
            .map_err(|e| SyncError::Store(format!("Failed to decode report {}: {e}", row.id)))?;
        Ok(Some(StoredVerificationReport {
            id: row.id,
            created_at: row.created_at,
            report,
        }))
    }

    async fn verification_history(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredVerificationReport>, SyncError> {
        let rows = VerificationReportRepo::history(&self.pool, limit, offset).await?;
        rows.into_iter()
            .map(|row| {
                let report: OverallVerificationReport = serde_json::from_value(row.report)
                    .map_err(|e| {
                        SyncError::Store(format!("Failed to decode report {}: {e}", row.id))
                    })?;
                Ok(StoredVerificationReport {
                    id: row.id,
                    created_at: row.created_at,
                    report,
                })
            })
            .collect()
    }
}
