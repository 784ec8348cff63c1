//! # strata
//!
//! Group-based, exactly-once SQL migrations.
//!
//! A migrations folder holds one directory per *group* and one `.sql` file per
//! *unit*. strata applies every unit exactly once, records what it ran in the
//! target database and skips it on later runs. All pending units of a run are
//! applied in a single transaction: either every group commits or none does.
//!
//! strata provides:
//! - A scanner that validates the two-level folder layout
//! - Count-based reconciliation against the recorded history, with warnings
//!   for groups that vanished or shrank
//! - Name-based planning of the pending units inside each group
//! - A SQLite history store that executes the plan atomically
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = SqliteHistory::connect("sqlite://./app.db").await?;
//!     let engine = MigrationEngine::new(
//!         MigrationConfig::new().migrations_dir("./migrations"),
//!         history,
//!     );
//!
//!     let report = engine.update(&CancellationToken::new()).await?;
//!     for warning in &report.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Migration engine: scanning, reconciliation, planning and history.
pub mod migrate {
    pub use strata_migrate::*;
}

/// SQLite history store.
pub mod sqlite {
    pub use strata_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strata_migrate::{
        CancellationToken, HistoryStore, MigrateResult, MigrationConfig, MigrationEngine,
        MigrationError, Warning,
    };
    pub use strata_sqlite::{SqliteConfig, SqliteHistory};
}

// Re-export key types at the crate root
pub use strata_migrate::{
    CancellationToken, ErrorKind, MigrateResult, MigrationConfig, MigrationEngine,
    MigrationError, StatusReport, UpdateReport, Warning,
};
pub use strata_sqlite::{SqliteError, SqliteHistory};
