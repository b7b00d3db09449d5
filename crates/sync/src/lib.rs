//! The import orchestration engine.
//!
//! Coordinates the multi-phase, checkpointed, cancellable pipeline that
//! pulls club, player, tournament, game, and statistics data from the
//! upstream site into the relational store. The engine talks to
//! persistence exclusively through the [`ImportStore`] seam and to the
//! upstream exclusively through the scraper crate's `PageFetcher`, so
//! the whole pipeline can be exercised hermetically in tests.
//!
//! [`ImportStore`]: store::ImportStore

pub mod alert;
pub mod error;
pub mod integrity;
pub mod orchestrator;
pub mod phase;
pub mod pg;
pub mod progress;
pub mod ratelimit;
pub mod store;
pub mod verification;

pub use error::SyncError;
pub use orchestrator::{ImportOrchestrator, SyncConfig};
pub use pg::PgImportStore;
pub use store::ImportStore;
pub use verification::VerificationService;
