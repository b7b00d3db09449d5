//! Structural validation of scraped records and per-run validation metrics.
//!
//! Validation here is purely structural (required fields, ranges,
//! enumerations). Referential checks are deferred to the post-phase
//! integrity sweep because a referenced entity may not be persisted yet
//! within the same run.

use serde::Serialize;

use crate::record::{
    ScrapedClub, ScrapedGame, ScrapedPlayer, ScrapedRecord, ScrapedTournament,
    ScrapedTournamentResult, ScrapedYearStats, VALID_GAME_RESULTS,
};

/// Plausible bounds for a rating value.
const RATING_MIN: f64 = 0.0;
const RATING_MAX: f64 = 4000.0;

/// Plausible bounds for a season year.
const YEAR_MIN: i32 = 1900;
const YEAR_MAX: i32 = 2100;

// ---------------------------------------------------------------------------
// Record validation
// ---------------------------------------------------------------------------

/// Validate a scraped record, returning all structural errors found.
///
/// An empty error list means the record may be persisted. A failing
/// record is dropped and counted; it never aborts the batch.
pub fn validate_record(record: &ScrapedRecord) -> Vec<String> {
    match record {
        ScrapedRecord::Club(r) => validate_club(r),
        ScrapedRecord::Player(r) => validate_player(r),
        ScrapedRecord::Tournament(r) => validate_tournament(r),
        ScrapedRecord::Game(r) => validate_game(r),
        ScrapedRecord::YearStats(r) => validate_year_stats(r),
        ScrapedRecord::TournamentResult(r) => validate_tournament_result(r),
    }
}

fn check_ext_id(errors: &mut Vec<String>, field: &str, value: i64) {
    if value <= 0 {
        errors.push(format!("{field} must be positive, got {value}"));
    }
}

fn check_name(errors: &mut Vec<String>, name: &str) {
    if name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
}

fn check_rating(errors: &mut Vec<String>, field: &str, rating: f64) {
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        errors.push(format!(
            "{field} must be between {RATING_MIN} and {RATING_MAX}, got {rating}"
        ));
    }
}

fn validate_club(club: &ScrapedClub) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", club.ext_id);
    check_name(&mut errors, &club.name);
    if let Some(year) = club.founded_year {
        if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
            errors.push(format!("founded_year out of range: {year}"));
        }
    }
    errors
}

fn validate_player(player: &ScrapedPlayer) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", player.ext_id);
    check_name(&mut errors, &player.name);
    if let Some(club_id) = player.club_ext_id {
        check_ext_id(&mut errors, "club_ext_id", club_id);
    }
    if let Some(rating) = player.rating {
        check_rating(&mut errors, "rating", rating);
    }
    if player.games_played < 0 {
        errors.push(format!(
            "games_played must not be negative, got {}",
            player.games_played
        ));
    }
    errors
}

fn validate_tournament(tournament: &ScrapedTournament) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", tournament.ext_id);
    check_name(&mut errors, &tournament.name);
    if let Some(club_id) = tournament.club_ext_id {
        check_ext_id(&mut errors, "club_ext_id", club_id);
    }
    if let Some(rounds) = tournament.rounds {
        if rounds <= 0 {
            errors.push(format!("rounds must be positive, got {rounds}"));
        }
    }
    errors
}

fn validate_game(game: &ScrapedGame) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", game.ext_id);
    check_ext_id(&mut errors, "tournament_ext_id", game.tournament_ext_id);
    check_ext_id(&mut errors, "white_ext_id", game.white_ext_id);
    check_ext_id(&mut errors, "black_ext_id", game.black_ext_id);
    if game.white_ext_id == game.black_ext_id && game.white_ext_id > 0 {
        errors.push("white_ext_id and black_ext_id must differ".to_string());
    }
    if !VALID_GAME_RESULTS.contains(&game.result.as_str()) {
        errors.push(format!(
            "Unknown game result '{}'. Valid results: {}",
            game.result,
            VALID_GAME_RESULTS.join(", ")
        ));
    }
    errors
}

fn validate_year_stats(stats: &ScrapedYearStats) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", stats.ext_id);
    check_ext_id(&mut errors, "player_ext_id", stats.player_ext_id);
    if !(YEAR_MIN..=YEAR_MAX).contains(&stats.year) {
        errors.push(format!("year out of range: {}", stats.year));
    }
    for (field, value) in [
        ("games_played", stats.games_played),
        ("wins", stats.wins),
        ("draws", stats.draws),
        ("losses", stats.losses),
    ] {
        if value < 0 {
            errors.push(format!("{field} must not be negative, got {value}"));
        }
    }
    if stats.wins + stats.draws + stats.losses > stats.games_played {
        errors.push(format!(
            "wins + draws + losses ({}) exceeds games_played ({})",
            stats.wins + stats.draws + stats.losses,
            stats.games_played
        ));
    }
    if let Some(rating) = stats.rating_end {
        check_rating(&mut errors, "rating_end", rating);
    }
    errors
}

fn validate_tournament_result(result: &ScrapedTournamentResult) -> Vec<String> {
    let mut errors = Vec::new();
    check_ext_id(&mut errors, "ext_id", result.ext_id);
    check_ext_id(&mut errors, "tournament_ext_id", result.tournament_ext_id);
    check_ext_id(&mut errors, "player_ext_id", result.player_ext_id);
    if result.rank <= 0 {
        errors.push(format!("rank must be positive, got {}", result.rank));
    }
    if result.points < 0.0 {
        errors.push(format!("points must not be negative, got {}", result.points));
    }
    errors
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Per-run validation counters.
///
/// Invariant: `valid_records + invalid_records == total_fetched`, which
/// holds because the counters only move through [`record_valid`] and
/// [`record_invalid`].
///
/// [`record_valid`]: ValidationMetrics::record_valid
/// [`record_invalid`]: ValidationMetrics::record_invalid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationMetrics {
    pub total_fetched: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
}

impl ValidationMetrics {
    pub fn record_valid(&mut self, count: u64) {
        self.total_fetched += count;
        self.valid_records += count;
    }

    pub fn record_invalid(&mut self, count: u64) {
        self.total_fetched += count;
        self.invalid_records += count;
    }

    /// Percentage of fetched records that passed validation.
    pub fn validation_rate(&self) -> f64 {
        rate_percent(self.valid_records, self.total_fetched)
    }
}

/// Compute `(numerator / denominator) * 100`, rounded to 2 decimal
/// places. Defined as exactly `0.0` when the denominator is zero.
pub fn rate_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let rate = numerator as f64 / denominator as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
