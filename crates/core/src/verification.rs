//! Sample-based verification math and report types.
//!
//! Verification reconciles a small random sample of persisted rows
//! against the live upstream source to detect silent drift. This module
//! holds the pure parts: sample sizing, field diffing, accuracy math,
//! and the report structures; the sampling and re-fetching loop lives in
//! the sync crate.

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::record::ScrapedRecord;
use crate::types::Timestamp;
use crate::validation::rate_percent;

/// Fraction of persisted rows to sample, as a percentage.
pub const SAMPLE_PERCENT: i64 = 1;

/// Ratings within this distance are considered matching.
pub const RATING_TOLERANCE: f64 = 0.5;

/// Minimum aggregate accuracy for a PASSED verdict.
pub const ACCURACY_PASS_THRESHOLD: f64 = 95.0;

/// Minimum aggregate accuracy for a WARNING verdict.
pub const ACCURACY_WARN_THRESHOLD: f64 = 85.0;

// ---------------------------------------------------------------------------
// Status and severity
// ---------------------------------------------------------------------------

/// Overall verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Warning,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "warning" => Some(Self::Warning),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a verification run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTrigger {
    Manual,
    Scheduled,
}

impl VerificationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "scheduled" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

/// Severity of a single field discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancySeverity {
    High,
    Medium,
    Low,
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A single field that differs between the store and the upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyDetail {
    pub ext_id: i64,
    pub field: String,
    pub stored: String,
    pub upstream: String,
    pub severity: DiscrepancySeverity,
}

/// Verification outcome for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityVerification {
    pub entity_type: EntityType,
    /// Rows persisted for this entity at sampling time.
    pub total_count: i64,
    /// Rows drawn into the sample.
    pub sample_size: i64,
    /// Sampled rows whose upstream re-fetch failed; excluded from the
    /// accuracy denominator.
    pub fetch_failures: i64,
    /// Sampled rows actually compared (`sample_size - fetch_failures`).
    pub compared: i64,
    /// Compared rows with no discrepancy.
    pub matched_count: i64,
    pub discrepancies: Vec<DiscrepancyDetail>,
    /// `matched / compared` as a percentage.
    pub accuracy: f64,
}

/// Aggregate verification report across all entity types.
///
/// Persisted as an append-only audit artifact; never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallVerificationReport {
    pub trigger: VerificationTrigger,
    pub status: VerificationStatus,
    pub overall_accuracy: f64,
    pub total_sampled: i64,
    pub total_compared: i64,
    pub total_matched: i64,
    pub entities: Vec<EntityVerification>,
    pub generated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

/// Sample size for a table of `total` rows: at least [`SAMPLE_PERCENT`]
/// of the rows, minimum 1 record, 0 for an empty table.
pub fn sample_size(total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((total * SAMPLE_PERCENT + 99) / 100).max(1)
}

/// Accuracy over the compared sample, rounded to 2 decimal places.
///
/// A verification with nothing to compare (empty store, or every
/// re-fetch failed) found no known discrepancies, so it reports 100.
pub fn accuracy_percent(matched: i64, compared: i64) -> f64 {
    if compared <= 0 {
        return 100.0;
    }
    rate_percent(matched.max(0) as u64, compared as u64)
}

/// Map an aggregate accuracy to the overall verdict.
pub fn status_for_accuracy(accuracy: f64) -> VerificationStatus {
    if accuracy >= ACCURACY_PASS_THRESHOLD {
        VerificationStatus::Passed
    } else if accuracy >= ACCURACY_WARN_THRESHOLD {
        VerificationStatus::Warning
    } else {
        VerificationStatus::Failed
    }
}

/// Whether two optional ratings match within [`RATING_TOLERANCE`].
pub fn ratings_match(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() <= RATING_TOLERANCE,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Field diffing
// ---------------------------------------------------------------------------

fn push_diff<T: std::fmt::Debug + PartialEq>(
    diffs: &mut Vec<DiscrepancyDetail>,
    ext_id: i64,
    field: &str,
    stored: &T,
    upstream: &T,
    severity: DiscrepancySeverity,
) {
    if stored != upstream {
        diffs.push(DiscrepancyDetail {
            ext_id,
            field: field.to_string(),
            stored: format!("{stored:?}"),
            upstream: format!("{upstream:?}"),
            severity,
        });
    }
}

fn push_rating_diff(
    diffs: &mut Vec<DiscrepancyDetail>,
    ext_id: i64,
    field: &str,
    stored: Option<f64>,
    upstream: Option<f64>,
) {
    if !ratings_match(stored, upstream) {
        diffs.push(DiscrepancyDetail {
            ext_id,
            field: field.to_string(),
            stored: format!("{stored:?}"),
            upstream: format!("{upstream:?}"),
            severity: DiscrepancySeverity::Low,
        });
    }
}

/// Diff a stored record against its upstream counterpart.
///
/// Identity fields (names, referenced ids, game results) are HIGH
/// severity, counts and standings MEDIUM, descriptive fields and
/// ratings (compared within [`RATING_TOLERANCE`]) LOW. Records of
/// different entity types produce a single HIGH discrepancy.
pub fn diff_records(stored: &ScrapedRecord, upstream: &ScrapedRecord) -> Vec<DiscrepancyDetail> {
    use DiscrepancySeverity::{High, Low, Medium};

    let mut diffs = Vec::new();
    let ext_id = stored.ext_id();

    match (stored, upstream) {
        (ScrapedRecord::Club(s), ScrapedRecord::Club(u)) => {
            push_diff(&mut diffs, ext_id, "name", &s.name, &u.name, High);
            push_diff(&mut diffs, ext_id, "city", &s.city, &u.city, Low);
            push_diff(
                &mut diffs,
                ext_id,
                "founded_year",
                &s.founded_year,
                &u.founded_year,
                Low,
            );
        }
        (ScrapedRecord::Player(s), ScrapedRecord::Player(u)) => {
            push_diff(&mut diffs, ext_id, "name", &s.name, &u.name, High);
            push_diff(
                &mut diffs,
                ext_id,
                "club_ext_id",
                &s.club_ext_id,
                &u.club_ext_id,
                Medium,
            );
            push_diff(
                &mut diffs,
                ext_id,
                "games_played",
                &s.games_played,
                &u.games_played,
                Medium,
            );
            push_rating_diff(&mut diffs, ext_id, "rating", s.rating, u.rating);
        }
        (ScrapedRecord::Tournament(s), ScrapedRecord::Tournament(u)) => {
            push_diff(&mut diffs, ext_id, "name", &s.name, &u.name, High);
            push_diff(
                &mut diffs,
                ext_id,
                "club_ext_id",
                &s.club_ext_id,
                &u.club_ext_id,
                Medium,
            );
            push_diff(&mut diffs, ext_id, "starts_on", &s.starts_on, &u.starts_on, Low);
            push_diff(&mut diffs, ext_id, "rounds", &s.rounds, &u.rounds, Medium);
        }
        (ScrapedRecord::Game(s), ScrapedRecord::Game(u)) => {
            push_diff(
                &mut diffs,
                ext_id,
                "tournament_ext_id",
                &s.tournament_ext_id,
                &u.tournament_ext_id,
                High,
            );
            push_diff(
                &mut diffs,
                ext_id,
                "white_ext_id",
                &s.white_ext_id,
                &u.white_ext_id,
                High,
            );
            push_diff(
                &mut diffs,
                ext_id,
                "black_ext_id",
                &s.black_ext_id,
                &u.black_ext_id,
                High,
            );
            push_diff(&mut diffs, ext_id, "result", &s.result, &u.result, High);
            push_diff(&mut diffs, ext_id, "round", &s.round, &u.round, Low);
        }
        (ScrapedRecord::YearStats(s), ScrapedRecord::YearStats(u)) => {
            push_diff(
                &mut diffs,
                ext_id,
                "player_ext_id",
                &s.player_ext_id,
                &u.player_ext_id,
                High,
            );
            push_diff(&mut diffs, ext_id, "year", &s.year, &u.year, High);
            push_diff(
                &mut diffs,
                ext_id,
                "games_played",
                &s.games_played,
                &u.games_played,
                Medium,
            );
            push_diff(&mut diffs, ext_id, "wins", &s.wins, &u.wins, Medium);
            push_diff(&mut diffs, ext_id, "draws", &s.draws, &u.draws, Medium);
            push_diff(&mut diffs, ext_id, "losses", &s.losses, &u.losses, Medium);
            push_rating_diff(&mut diffs, ext_id, "rating_end", s.rating_end, u.rating_end);
        }
        (ScrapedRecord::TournamentResult(s), ScrapedRecord::TournamentResult(u)) => {
            push_diff(
                &mut diffs,
                ext_id,
                "tournament_ext_id",
                &s.tournament_ext_id,
                &u.tournament_ext_id,
                High,
            );
            push_diff(
                &mut diffs,
                ext_id,
                "player_ext_id",
                &s.player_ext_id,
                &u.player_ext_id,
                High,
            );
            push_diff(&mut diffs, ext_id, "rank", &s.rank, &u.rank, Medium);
            push_diff(&mut diffs, ext_id, "points", &s.points, &u.points, Medium);
        }
        _ => {
            diffs.push(DiscrepancyDetail {
                ext_id,
                field: "entity_type".to_string(),
                stored: stored.entity_type().to_string(),
                upstream: upstream.entity_type().to_string(),
                severity: High,
            });
        }
    }

    diffs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
