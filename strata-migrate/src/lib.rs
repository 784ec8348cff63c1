//! # strata-migrate
//!
//! Reconciliation and execution engine for group-based SQL migrations.
//!
//! Migrations live in a two-level folder: each directory under the
//! migrations root is a *group*, each `.sql` file inside it a *unit*. The
//! engine applies every unit exactly once and records what it ran, so
//! repeated runs are idempotent and incremental.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Scanner      │────▶│ Reconciler     │────▶│ Planner     │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                              ▲                     │
//!                              │                     ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │ History Store  │◀────│ apply_batch │
//!                      └────────────────┘     └─────────────┘
//! ```
//!
//! - The scanner validates the folder layout and lists groups and units.
//! - The reconciler compares unit counts against history and keeps only
//!   groups that are new or have grown. Shrunk and vanished groups produce
//!   [`Warning`]s and are never repaired.
//! - The planner diffs each candidate's unit names against the names
//!   recorded for it.
//! - The [`HistoryStore`] applies the whole plan in a single transaction and
//!   records one row per applied unit. A failure in any group rolls back
//!   every group of the batch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{MigrationConfig, MigrationEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(history: impl strata_migrate::HistoryStore) -> strata_migrate::MigrateResult<()> {
//!     let config = MigrationConfig::new().migrations_dir("./migrations");
//!     let engine = MigrationEngine::new(config, history);
//!
//!     let report = engine.update(&CancellationToken::new()).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod history;
pub mod plan;
pub mod reconcile;
pub mod scan;

// Re-exports
pub use engine::{MigrationConfig, MigrationEngine, StatusReport, UpdateReport};
pub use error::{ErrorKind, MigrateResult, MigrationError};
pub use history::{
    AppliedGroup, GroupSummary, HistoryStore, SchemaBootstrap, SchemaState, UnitRecord,
};
pub use plan::{ExecutionPlan, PendingUnit, PlannedGroup, Planner, counted};
pub use reconcile::{Candidate, Reconciliation, Warning, reconcile};
pub use scan::{MigrationScanner, ScanResult, UNIT_EXTENSION};
pub use tokio_util::sync::CancellationToken;
