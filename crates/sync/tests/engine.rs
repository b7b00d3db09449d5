//! End-to-end tests for the import engine against the in-memory store
//! and a scripted upstream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use clubsync_core::backoff::BackoffConfig;
use clubsync_core::entity::{EntityType, ImportStrategy};
use clubsync_core::import::{Checkpoint, ImportStatus};
use clubsync_core::types::DbId;
use clubsync_scraper::client::PageFetcher;
use clubsync_scraper::ScrapeError;
use clubsync_sync::alert::AlertSender;
use clubsync_sync::integrity::{self, IntegrityStatus};
use clubsync_sync::store::{ImportStore, RunSnapshot};
use clubsync_sync::{ImportOrchestrator, SyncConfig, SyncError};

use common::{
    club, game, invalid_player, player, tournament, tournament_result, year_stats, FakeFetcher,
    MemoryImportStore, RecordingAlerts,
};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<MemoryImportStore>,
    fetcher: Arc<FakeFetcher>,
    alerts: Arc<RecordingAlerts>,
    orchestrator: Arc<ImportOrchestrator>,
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        backoff: BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            max_attempts: 2,
        },
        rate_limit_window_ms: 60_000,
        rate_limit_max_requests: 100_000,
        max_run_secs: 30,
    }
}

fn harness() -> Harness {
    harness_with(fast_config())
}

fn harness_with(config: SyncConfig) -> Harness {
    let store = Arc::new(MemoryImportStore::new());
    let fetcher = Arc::new(FakeFetcher::new());
    let alerts = Arc::new(RecordingAlerts::default());
    let orchestrator = Arc::new(ImportOrchestrator::new(
        Arc::clone(&store) as Arc<dyn ImportStore>,
        Arc::clone(&fetcher) as Arc<dyn PageFetcher>,
        Arc::clone(&alerts) as Arc<dyn AlertSender>,
        config,
    ));
    Harness {
        store,
        fetcher,
        alerts,
        orchestrator,
    }
}

/// Script a small but complete upstream site.
fn seed_full_site(fetcher: &FakeFetcher) {
    fetcher.set_pages(EntityType::Club, vec![vec![club(1), club(2)]]);
    fetcher.set_pages(
        EntityType::Player,
        vec![vec![player(1, Some(1)), player(2, Some(2))]],
    );
    fetcher.set_pages(EntityType::Tournament, vec![vec![tournament(1)]]);
    fetcher.set_pages(EntityType::Game, vec![vec![game(1, 1, 1, 2)]]);
    fetcher.set_pages(EntityType::YearStats, vec![vec![year_stats(1, 1)]]);
    fetcher.set_pages(
        EntityType::TournamentResult,
        vec![vec![tournament_result(1, 1, 1)]],
    );
}

async fn wait_terminal(store: &MemoryImportStore, run_id: DbId) -> RunSnapshot {
    for _ in 0..1000 {
        if let Some(run) = store.get_run(run_id).await.unwrap() {
            if run.status.is_terminal() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("run {run_id} never reached a terminal status");
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_import_completes_all_phases() {
    let h = harness();
    seed_full_site(&h.fetcher);

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Full, Some(8))
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Completed);
    assert_eq!(run.progress_percent, 100);
    assert_eq!(run.processed_records, 8);
    assert!(run.last_error.is_none());

    // All six entity types persisted.
    assert_eq!(h.store.entity_ids(EntityType::Club), vec![1, 2]);
    assert_eq!(h.store.entity_ids(EntityType::Player), vec![1, 2]);
    assert_eq!(h.store.entity_ids(EntityType::Game), vec![1]);
    assert_eq!(h.store.entity_ids(EntityType::TournamentResult), vec![1]);

    // Checkpoint cleared and lock released on completion.
    assert!(h.store.read_checkpoint().await.unwrap().is_none());
    assert!(h.store.lock_holder().is_none());
}

#[tokio::test]
async fn phases_run_in_dependency_order() {
    let h = harness();
    seed_full_site(&h.fetcher);

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Full, None)
        .await
        .unwrap();
    wait_terminal(&h.store, run_id).await;

    let log = h.fetcher.fetch_log();
    let first_of = |entity: EntityType| log.iter().position(|(e, _)| *e == entity).unwrap();
    assert!(first_of(EntityType::Club) < first_of(EntityType::Player));
    assert!(first_of(EntityType::Player) < first_of(EntityType::Tournament));
    assert!(first_of(EntityType::Tournament) < first_of(EntityType::Game));
    assert!(first_of(EntityType::Game) < first_of(EntityType::YearStats));
    assert!(first_of(EntityType::YearStats) < first_of(EntityType::TournamentResult));
}

#[tokio::test]
async fn single_entity_strategy_fetches_only_that_entity() {
    let h = harness();
    seed_full_site(&h.fetcher);

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Completed);
    assert!(h.fetcher.fetch_log().iter().all(|(e, _)| *e == EntityType::Club));
    assert!(h.store.entity_ids(EntityType::Player).is_empty());
}

#[tokio::test]
async fn rerunning_the_same_import_is_idempotent() {
    let h = harness();
    seed_full_site(&h.fetcher);

    let first = h
        .orchestrator
        .start_import(ImportStrategy::Full, None)
        .await
        .unwrap();
    wait_terminal(&h.store, first).await;
    let ids_after_first = h.store.entity_ids(EntityType::Player);

    let second = h
        .orchestrator
        .start_import(ImportStrategy::Full, None)
        .await
        .unwrap();
    wait_terminal(&h.store, second).await;

    assert_eq!(h.store.entity_ids(EntityType::Player), ids_after_first);
    assert_eq!(h.store.entity_ids(EntityType::Club), vec![1, 2]);
}

// ---------------------------------------------------------------------------
// Lock semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_while_locked_returns_conflict_and_touches_nothing() {
    let h = harness();
    seed_full_site(&h.fetcher);
    assert!(h.store.acquire_lock("someone-else").await.unwrap());

    let result = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await;

    assert_matches!(result, Err(SyncError::LockHeld));
    assert_eq!(h.store.run_count(), 0);
    assert_eq!(h.store.checkpoint_writes(), 0);
    assert_eq!(h.store.lock_holder().as_deref(), Some("someone-else"));
}

#[tokio::test]
async fn concurrent_acquires_grant_exactly_one() {
    let store = Arc::new(MemoryImportStore::new());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.acquire_lock(&format!("holder-{i}")).await.unwrap()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);

    // After release, the lock is available again.
    store.release_lock().await.unwrap();
    assert!(store.acquire_lock("next").await.unwrap());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_records_are_dropped_and_counted_not_fatal() {
    let h = harness();
    h.fetcher.set_pages(
        EntityType::Player,
        vec![vec![player(1, None), invalid_player(2), player(3, None)]],
    );

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Player), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Completed);
    assert_eq!(run.metrics.total_fetched, 3);
    assert_eq!(run.metrics.valid_records, 2);
    assert_eq!(run.metrics.invalid_records, 1);
    assert_eq!(
        run.metrics.valid_records + run.metrics.invalid_records,
        run.metrics.total_fetched
    );
    // The invalid record was never persisted.
    assert_eq!(h.store.entity_ids(EntityType::Player), vec![1, 3]);
}

// ---------------------------------------------------------------------------
// Skipped pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_page_is_skipped_and_later_retried() {
    let h = harness();
    h.fetcher.set_pages(
        EntityType::Player,
        vec![
            vec![player(1, None)],
            vec![player(2, None)],
            vec![player(3, None)],
        ],
    );
    h.fetcher
        .fail_page(EntityType::Player, 2, ScrapeError::Timeout);

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Player), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    // The phase completed with pages 1 and 3; page 2 was deferred.
    assert_eq!(run.status, ImportStatus::Completed);
    assert_eq!(h.store.entity_ids(EntityType::Player), vec![1, 3]);
    assert_eq!(
        h.store.skipped_pages(EntityType::Player).await.unwrap(),
        vec![2]
    );

    // The upstream recovers; retry only the listed page.
    h.fetcher.heal_page(EntityType::Player, 2);
    let outcome = h
        .orchestrator
        .retry_skipped_pages(EntityType::Player, &[2])
        .await
        .unwrap();

    assert_eq!(outcome.retried, vec![2]);
    assert_eq!(outcome.merged_records, 1);
    assert!(outcome.still_failing.is_empty());
    assert_eq!(h.store.entity_ids(EntityType::Player), vec![1, 2, 3]);
    assert!(h
        .store
        .skipped_pages(EntityType::Player)
        .await
        .unwrap()
        .is_empty());
    assert!(h.store.lock_holder().is_none());
}

#[tokio::test]
async fn sustained_page_failures_fail_the_run() {
    let h = harness();
    h.fetcher.set_pages(
        EntityType::Club,
        vec![vec![club(1)]; 6],
    );
    for page in 1..=6 {
        h.fetcher
            .fail_page(EntityType::Club, page, ScrapeError::Timeout);
    }

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    // Three consecutive skips are treated as an outage, not bad pages.
    assert_eq!(run.status, ImportStatus::Failed);
    assert_eq!(
        h.store.skipped_pages(EntityType::Club).await.unwrap(),
        vec![1, 2, 3]
    );
    assert!(h.store.lock_holder().is_none());
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_at_the_batch_boundary() {
    let h = harness();
    let pages: Vec<Vec<_>> = (1..=10).map(|i| vec![club(i)]).collect();
    h.fetcher.set_pages(EntityType::Club, pages);

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await
        .unwrap();

    // Cancel while page 4 is being served: batch 4 still commits, then
    // the phase observes the signal before fetching page 5.
    let orchestrator = Arc::clone(&h.orchestrator);
    h.fetcher.on_page(move |entity, page| {
        if entity == EntityType::Club && page == 4 {
            let _ = orchestrator.cancel(run_id);
        }
    });

    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Cancelled);
    let checkpoint = h.store.read_checkpoint().await.unwrap().unwrap();
    assert_eq!(checkpoint.phase, EntityType::Club);
    assert_eq!(checkpoint.batch_index, 4);
    assert_eq!(h.store.entity_ids(EntityType::Club), vec![1, 2, 3, 4]);
    assert!(h.store.lock_holder().is_none());

    // Page 5 was never fetched.
    assert!(!h
        .fetcher
        .fetch_log()
        .contains(&(EntityType::Club, 5)));
}

#[tokio::test]
async fn cancelling_unknown_run_is_an_error() {
    let h = harness();
    assert_matches!(h.orchestrator.cancel(999), Err(SyncError::RunNotFound(999)));
}

// ---------------------------------------------------------------------------
// Resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_replays_at_most_one_batch() {
    let h = harness();
    seed_full_site(&h.fetcher);
    h.fetcher.set_pages(
        EntityType::Player,
        vec![
            vec![player(1, None)],
            vec![player(2, None)],
            vec![player(3, None)],
            vec![player(4, None)],
        ],
    );

    // A previous attempt committed players up to page 2 and crashed.
    h.store
        .write_checkpoint(&Checkpoint {
            phase: EntityType::Player,
            batch_index: 2,
            last_processed_id: Some(2),
            progress_percent: 40,
        })
        .await
        .unwrap();
    h.store
        .upsert_batch(EntityType::Club, &[club(1), club(2)])
        .await
        .unwrap();
    h.store
        .upsert_batch(EntityType::Player, &[player(1, None), player(2, None)])
        .await
        .unwrap();

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Full, None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;
    assert_eq!(run.status, ImportStatus::Completed);

    let log = h.fetcher.fetch_log();
    // Completed phases are not replayed.
    assert!(log.iter().all(|(e, _)| *e != EntityType::Club));
    // The interrupted phase resumes after its last committed batch.
    let player_pages: Vec<u32> = log
        .iter()
        .filter(|(e, _)| *e == EntityType::Player)
        .map(|(_, p)| *p)
        .collect();
    assert_eq!(player_pages.first(), Some(&3));
    assert_eq!(h.store.entity_ids(EntityType::Player), vec![1, 2, 3, 4]);
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unavailable_upstream_fails_the_run_and_alerts() {
    let h = harness();
    h.fetcher.set_pages(EntityType::Club, vec![vec![club(1)]]);
    h.fetcher.fail_page(
        EntityType::Club,
        1,
        ScrapeError::Unavailable("connection refused".to_string()),
    );

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Failed);
    assert!(run.last_error.unwrap().contains("unavailable"));
    assert!(h.store.lock_holder().is_none());

    let alerts = h.alerts.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].import_id, run_id);
}

#[tokio::test]
async fn run_timeout_fails_resumably() {
    let mut config = fast_config();
    config.max_run_secs = 0;
    let h = harness_with(config);
    h.fetcher
        .set_pages(EntityType::Club, (1..=5).map(|i| vec![club(i)]).collect());
    h.fetcher.set_delay(Duration::from_millis(50));

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Single(EntityType::Club), None)
        .await
        .unwrap();
    let run = wait_terminal(&h.store, run_id).await;

    assert_eq!(run.status, ImportStatus::Failed);
    assert!(run.last_error.unwrap().contains("timed out"));
    assert!(h.store.lock_holder().is_none());
}

// ---------------------------------------------------------------------------
// Integrity sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orphan_battery_reports_warnings() {
    let store = MemoryImportStore::new();
    store
        .upsert_batch(EntityType::Player, &[player(1, Some(99))])
        .await
        .unwrap();
    store
        .upsert_batch(EntityType::Game, &[game(1, 42, 1, 7)])
        .await
        .unwrap();

    let summary = integrity::run_checks(&store).await.unwrap();

    assert_eq!(summary.status, IntegrityStatus::Fail);
    assert_eq!(summary.total_checks, 6);
    // players -> missing club, games -> missing player, games -> missing
    // tournament.
    assert_eq!(summary.failed_checks, 3);
    assert!(summary.issues.iter().any(|i| i.contains("club")));
}

// ---------------------------------------------------------------------------
// Status projection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reflects_the_latest_run() {
    let h = harness();
    seed_full_site(&h.fetcher);

    // No runs yet.
    let empty = h.orchestrator.status().await.unwrap();
    assert!(!empty.is_running);
    assert!(empty.import_id.is_none());

    let run_id = h
        .orchestrator
        .start_import(ImportStrategy::Full, Some(8))
        .await
        .unwrap();
    wait_terminal(&h.store, run_id).await;

    let status = h.orchestrator.status().await.unwrap();
    assert!(!status.is_running);
    assert_eq!(status.import_id, Some(run_id));
    assert_eq!(status.progress, Some(100));
    assert_eq!(status.validation.total_records_processed, 8);
    assert_eq!(
        status.validation.valid_records + status.validation.invalid_records,
        status.validation.total_records_processed
    );
    assert_eq!(status.validation.validation_rate, 100.0);
}
