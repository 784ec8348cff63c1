//! SQLite migration history for strata.
//!
//! Stores the groups and units applied by [`strata_migrate::MigrationEngine`]
//! in two tables, using `tokio-rusqlite` for asynchronous access.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_migrate::{CancellationToken, MigrationConfig, MigrationEngine};
//! use strata_sqlite::SqliteHistory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let history = SqliteHistory::connect("sqlite://./app.db").await?;
//!     let config = MigrationConfig::new().migrations_dir("./migrations");
//!     let engine = MigrationEngine::new(config, history);
//!
//!     let report = engine.update(&CancellationToken::new()).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use error::{SqliteError, SqliteResult};
pub use schema::{GROUP_TABLE, UNIT_TABLE};
pub use store::SqliteHistory;
