//! Shared test support: an in-memory [`ImportStore`], a scripted
//! [`PageFetcher`], and a recording alert sender.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use clubsync_core::entity::{EntityType, ImportStrategy};
use clubsync_core::import::{Checkpoint, ImportStatus};
use clubsync_core::record::{
    ScrapedClub, ScrapedGame, ScrapedPlayer, ScrapedRecord, ScrapedTournament,
    ScrapedTournamentResult, ScrapedYearStats,
};
use clubsync_core::types::{DbId, Timestamp};
use clubsync_core::validation::ValidationMetrics;
use clubsync_core::verification::OverallVerificationReport;
use clubsync_scraper::client::PageFetcher;
use clubsync_scraper::ScrapeError;
use clubsync_sync::alert::{AlertError, AlertSender, SyncFailureAlert};
use clubsync_sync::integrity::IntegrityCheck;
use clubsync_sync::store::{ImportStore, RunProgress, RunSnapshot, StoredVerificationReport};
use clubsync_sync::SyncError;

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn club(ext_id: i64) -> ScrapedRecord {
    ScrapedRecord::Club(ScrapedClub {
        ext_id,
        name: format!("Club {ext_id}"),
        city: Some("Uppsala".to_string()),
        founded_year: Some(1950),
    })
}

pub fn player(ext_id: i64, club_ext_id: Option<i64>) -> ScrapedRecord {
    ScrapedRecord::Player(ScrapedPlayer {
        ext_id,
        name: format!("Player {ext_id}"),
        club_ext_id,
        rating: Some(1500.0 + ext_id as f64),
        games_played: 10,
    })
}

pub fn invalid_player(ext_id: i64) -> ScrapedRecord {
    ScrapedRecord::Player(ScrapedPlayer {
        ext_id,
        name: String::new(), // fails structural validation
        club_ext_id: None,
        rating: None,
        games_played: 0,
    })
}

pub fn tournament(ext_id: i64) -> ScrapedRecord {
    ScrapedRecord::Tournament(ScrapedTournament {
        ext_id,
        name: format!("Open {ext_id}"),
        club_ext_id: None,
        starts_on: None,
        rounds: Some(7),
    })
}

pub fn game(ext_id: i64, tournament_ext_id: i64, white: i64, black: i64) -> ScrapedRecord {
    ScrapedRecord::Game(ScrapedGame {
        ext_id,
        tournament_ext_id,
        white_ext_id: white,
        black_ext_id: black,
        result: "1-0".to_string(),
        round: Some(1),
    })
}

pub fn year_stats(ext_id: i64, player_ext_id: i64) -> ScrapedRecord {
    ScrapedRecord::YearStats(ScrapedYearStats {
        ext_id,
        player_ext_id,
        year: 2024,
        games_played: 12,
        wins: 5,
        draws: 4,
        losses: 3,
        rating_end: Some(1600.0),
    })
}

pub fn tournament_result(ext_id: i64, tournament_ext_id: i64, player_ext_id: i64) -> ScrapedRecord {
    ScrapedRecord::TournamentResult(ScrapedTournamentResult {
        ext_id,
        tournament_ext_id,
        player_ext_id,
        rank: 1,
        points: 5.5,
    })
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    lock: Option<String>,
    checkpoint: Option<Checkpoint>,
    checkpoint_writes: u32,
    next_run_id: DbId,
    runs: BTreeMap<DbId, RunSnapshot>,
    entities: HashMap<EntityType, BTreeMap<i64, ScrapedRecord>>,
    skipped: HashMap<EntityType, BTreeSet<u32>>,
    buckets: HashMap<String, (u32, Timestamp)>,
    reports: Vec<StoredVerificationReport>,
}

/// In-memory [`ImportStore`] with the same observable semantics as the
/// Postgres implementation. Sampling is deterministic (lowest ids
/// first) so tests can assert on exact records.
#[derive(Default)]
pub struct MemoryImportStore {
    inner: Mutex<StoreInner>,
    /// When set, `increment_rate_bucket` fails, exercising fail-open.
    pub fail_rate_bucket: AtomicBool,
}

impl MemoryImportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_writes(&self) -> u32 {
        self.inner.lock().unwrap().checkpoint_writes
    }

    pub fn lock_holder(&self) -> Option<String> {
        self.inner.lock().unwrap().lock.clone()
    }

    pub fn entity_ids(&self, entity: EntityType) -> Vec<i64> {
        self.inner
            .lock()
            .unwrap()
            .entities
            .get(&entity)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn run_count(&self) -> usize {
        self.inner.lock().unwrap().runs.len()
    }

    fn store_err() -> SyncError {
        SyncError::Store("memory store unavailable".to_string())
    }
}

#[async_trait]
impl ImportStore for MemoryImportStore {
    async fn acquire_lock(&self, holder: &str) -> Result<bool, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.lock.is_some() {
            return Ok(false);
        }
        inner.lock = Some(holder.to_string());
        Ok(true)
    }

    async fn release_lock(&self) -> Result<(), SyncError> {
        self.inner.lock().unwrap().lock = None;
        Ok(())
    }

    async fn read_checkpoint(&self) -> Result<Option<Checkpoint>, SyncError> {
        Ok(self.inner.lock().unwrap().checkpoint.clone())
    }

    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.checkpoint = Some(checkpoint.clone());
        inner.checkpoint_writes += 1;
        Ok(())
    }

    async fn clear_checkpoint(&self) -> Result<(), SyncError> {
        self.inner.lock().unwrap().checkpoint = None;
        Ok(())
    }

    async fn create_run(
        &self,
        strategy: &ImportStrategy,
        total_records: Option<i64>,
    ) -> Result<DbId, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_run_id += 1;
        let id = inner.next_run_id;
        inner.runs.insert(
            id,
            RunSnapshot {
                id,
                strategy: strategy.as_str().to_string(),
                status: ImportStatus::Pending,
                progress_percent: 0,
                processed_records: 0,
                total_records,
                metrics: ValidationMetrics::default(),
                current_operation: None,
                last_error: None,
                started_at: Utc::now(),
                finished_at: None,
            },
        );
        Ok(id)
    }

    async fn set_run_status(
        &self,
        run_id: DbId,
        status: ImportStatus,
        last_error: Option<&str>,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(&run_id)
            .ok_or(SyncError::RunNotFound(run_id))?;
        run.status = status;
        if let Some(err) = last_error {
            run.last_error = Some(err.to_string());
        }
        if status.is_terminal() {
            run.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn update_run_progress(
        &self,
        run_id: DbId,
        progress: &RunProgress,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .get_mut(&run_id)
            .ok_or(SyncError::RunNotFound(run_id))?;
        run.processed_records = progress.processed_records;
        run.progress_percent = progress.progress_percent;
        if progress.total_records.is_some() {
            run.total_records = progress.total_records;
        }
        run.current_operation = Some(progress.current_operation.clone());
        run.metrics = progress.metrics;
        Ok(())
    }

    async fn get_run(&self, run_id: DbId) -> Result<Option<RunSnapshot>, SyncError> {
        Ok(self.inner.lock().unwrap().runs.get(&run_id).cloned())
    }

    async fn latest_run(&self) -> Result<Option<RunSnapshot>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .runs
            .values()
            .last()
            .cloned())
    }

    async fn list_runs(&self, limit: i64, _offset: i64) -> Result<Vec<RunSnapshot>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .runs
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn upsert_batch(
        &self,
        entity: EntityType,
        records: &[ScrapedRecord],
    ) -> Result<u64, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        let map = inner.entities.entry(entity).or_default();
        for record in records {
            map.insert(record.ext_id(), record.clone());
        }
        Ok(records.len() as u64)
    }

    async fn entity_count(&self, entity: EntityType) -> Result<i64, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entities
            .get(&entity)
            .map(|m| m.len() as i64)
            .unwrap_or(0))
    }

    async fn sample_ext_ids(&self, entity: EntityType, n: i64) -> Result<Vec<i64>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entities
            .get(&entity)
            .map(|m| m.keys().copied().take(n as usize).collect())
            .unwrap_or_default())
    }

    async fn stored_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entities
            .get(&entity)
            .and_then(|m| m.get(&ext_id))
            .cloned())
    }

    async fn orphan_counts(&self) -> Result<Vec<(IntegrityCheck, i64)>, SyncError> {
        let inner = self.inner.lock().unwrap();
        let ids = |entity: EntityType| -> BTreeSet<i64> {
            inner
                .entities
                .get(&entity)
                .map(|m| m.keys().copied().collect())
                .unwrap_or_default()
        };
        let clubs = ids(EntityType::Club);
        let players = ids(EntityType::Player);
        let tournaments = ids(EntityType::Tournament);

        let mut players_club = 0;
        let mut games_players = 0;
        let mut games_tournament = 0;
        let mut stats_player = 0;
        let mut results_tournament = 0;
        let mut results_player = 0;

        if let Some(map) = inner.entities.get(&EntityType::Player) {
            for record in map.values() {
                if let ScrapedRecord::Player(p) = record {
                    if let Some(club_id) = p.club_ext_id {
                        if !clubs.contains(&club_id) {
                            players_club += 1;
                        }
                    }
                }
            }
        }
        if let Some(map) = inner.entities.get(&EntityType::Game) {
            for record in map.values() {
                if let ScrapedRecord::Game(g) = record {
                    if !players.contains(&g.white_ext_id) || !players.contains(&g.black_ext_id) {
                        games_players += 1;
                    }
                    if !tournaments.contains(&g.tournament_ext_id) {
                        games_tournament += 1;
                    }
                }
            }
        }
        if let Some(map) = inner.entities.get(&EntityType::YearStats) {
            for record in map.values() {
                if let ScrapedRecord::YearStats(s) = record {
                    if !players.contains(&s.player_ext_id) {
                        stats_player += 1;
                    }
                }
            }
        }
        if let Some(map) = inner.entities.get(&EntityType::TournamentResult) {
            for record in map.values() {
                if let ScrapedRecord::TournamentResult(r) = record {
                    if !tournaments.contains(&r.tournament_ext_id) {
                        results_tournament += 1;
                    }
                    if !players.contains(&r.player_ext_id) {
                        results_player += 1;
                    }
                }
            }
        }

        Ok(vec![
            (IntegrityCheck::PlayersClub, players_club),
            (IntegrityCheck::GamesPlayers, games_players),
            (IntegrityCheck::GamesTournament, games_tournament),
            (IntegrityCheck::YearStatsPlayer, stats_player),
            (IntegrityCheck::ResultsTournament, results_tournament),
            (IntegrityCheck::ResultsPlayer, results_player),
        ])
    }

    async fn record_skipped_page(
        &self,
        entity: EntityType,
        page: u32,
        _reason: &str,
    ) -> Result<(), SyncError> {
        self.inner
            .lock()
            .unwrap()
            .skipped
            .entry(entity)
            .or_default()
            .insert(page);
        Ok(())
    }

    async fn skipped_pages(&self, entity: EntityType) -> Result<Vec<u32>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .skipped
            .get(&entity)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn clear_skipped_page(&self, entity: EntityType, page: u32) -> Result<(), SyncError> {
        if let Some(set) = self.inner.lock().unwrap().skipped.get_mut(&entity) {
            set.remove(&page);
        }
        Ok(())
    }

    async fn increment_rate_bucket(
        &self,
        bucket: &str,
        window_ms: u64,
    ) -> Result<(u32, Timestamp), SyncError> {
        if self.fail_rate_bucket.load(Ordering::SeqCst) {
            return Err(Self::store_err());
        }
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .buckets
            .entry(bucket.to_string())
            .or_insert((0, now));
        let window_age = now - entry.1;
        if window_age >= chrono::Duration::milliseconds(window_ms as i64) {
            *entry = (1, now);
        } else {
            entry.0 += 1;
        }
        Ok(*entry)
    }

    async fn save_verification_report(
        &self,
        report: &OverallVerificationReport,
    ) -> Result<DbId, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.reports.len() as DbId + 1;
        inner.reports.push(StoredVerificationReport {
            id,
            created_at: Utc::now(),
            report: report.clone(),
        });
        Ok(id)
    }

    async fn latest_verification_report(
        &self,
    ) -> Result<Option<StoredVerificationReport>, SyncError> {
        Ok(self.inner.lock().unwrap().reports.last().cloned())
    }

    async fn verification_history(
        &self,
        limit: i64,
        _offset: i64,
    ) -> Result<Vec<StoredVerificationReport>, SyncError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reports
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Scripted fetcher
// ---------------------------------------------------------------------------

type PageHook = Box<dyn Fn(EntityType, u32) + Send + Sync>;

#[derive(Default)]
struct FetcherInner {
    pages: HashMap<EntityType, Vec<Vec<ScrapedRecord>>>,
    page_errors: HashMap<(EntityType, u32), ScrapeError>,
    records: HashMap<(EntityType, i64), ScrapedRecord>,
    record_errors: HashMap<(EntityType, i64), ScrapeError>,
    missing_records: BTreeSet<(EntityType, i64)>,
    fetch_log: Vec<(EntityType, u32)>,
    on_page: Option<PageHook>,
    delay: Option<Duration>,
}

/// [`PageFetcher`] that serves scripted pages and records.
#[derive(Default)]
pub struct FakeFetcher {
    inner: Mutex<FetcherInner>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the paginated index for one entity (index 0 is page 1).
    pub fn set_pages(&self, entity: EntityType, pages: Vec<Vec<ScrapedRecord>>) {
        self.inner.lock().unwrap().pages.insert(entity, pages);
    }

    /// Make a page fail persistently with the given error.
    pub fn fail_page(&self, entity: EntityType, page: u32, error: ScrapeError) {
        self.inner
            .lock()
            .unwrap()
            .page_errors
            .insert((entity, page), error);
    }

    /// Clear a previously scripted page failure.
    pub fn heal_page(&self, entity: EntityType, page: u32) {
        self.inner.lock().unwrap().page_errors.remove(&(entity, page));
    }

    /// Script the single-record endpoint used by verification.
    pub fn set_record(&self, record: ScrapedRecord) {
        let key = (record.entity_type(), record.ext_id());
        self.inner.lock().unwrap().records.insert(key, record);
    }

    pub fn fail_record(&self, entity: EntityType, ext_id: i64, error: ScrapeError) {
        self.inner
            .lock()
            .unwrap()
            .record_errors
            .insert((entity, ext_id), error);
    }

    pub fn set_record_missing(&self, entity: EntityType, ext_id: i64) {
        self.inner
            .lock()
            .unwrap()
            .missing_records
            .insert((entity, ext_id));
    }

    /// Install a hook invoked on every page request, before the page is
    /// served. A hook that cancels the run on page N lets page N commit
    /// and stops the phase at the next batch boundary.
    pub fn on_page(&self, hook: impl Fn(EntityType, u32) + Send + Sync + 'static) {
        self.inner.lock().unwrap().on_page = Some(Box::new(hook));
    }

    /// Add latency to every page fetch.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    /// Pages requested so far, in order.
    pub fn fetch_log(&self) -> Vec<(EntityType, u32)> {
        self.inner.lock().unwrap().fetch_log.clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(
        &self,
        entity: EntityType,
        page: u32,
    ) -> Result<Vec<ScrapedRecord>, ScrapeError> {
        let (result, delay) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_log.push((entity, page));

            if let Some(hook) = &inner.on_page {
                hook(entity, page);
            }

            let result = if let Some(err) = inner.page_errors.get(&(entity, page)) {
                Err(err.clone())
            } else {
                let records = inner
                    .pages
                    .get(&entity)
                    .and_then(|pages| pages.get((page - 1) as usize))
                    .cloned()
                    .unwrap_or_default();
                Ok(records)
            };
            (result, inner.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_record(
        &self,
        entity: EntityType,
        ext_id: i64,
    ) -> Result<Option<ScrapedRecord>, ScrapeError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = inner.record_errors.get(&(entity, ext_id)) {
            return Err(err.clone());
        }
        if inner.missing_records.contains(&(entity, ext_id)) {
            return Ok(None);
        }
        Ok(inner.records.get(&(entity, ext_id)).cloned())
    }
}

// ---------------------------------------------------------------------------
// Recording alert sender
// ---------------------------------------------------------------------------

/// Captures failure alerts for assertions.
#[derive(Default)]
pub struct RecordingAlerts {
    pub alerts: Mutex<Vec<SyncFailureAlert>>,
}

#[async_trait]
impl AlertSender for RecordingAlerts {
    async fn send_sync_failure(&self, alert: &SyncFailureAlert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
