//! CLI command implementations.

pub mod history;
pub mod status;
pub mod update;
pub mod version;

use strata_migrate::{MigrationConfig, MigrationEngine};
use strata_sqlite::SqliteHistory;

use crate::config::Config;
use crate::error::CliResult;
use crate::output;

/// Print where the configuration points.
fn print_config(config: &Config) {
    output::kv("Migrations", &config.migration_folder.display().to_string());
    output::kv("Database", &config.connection_string);
    output::newline();
}

/// Open the history store and build an engine over it.
async fn open_engine(config: &Config) -> CliResult<MigrationEngine<SqliteHistory>> {
    let history = SqliteHistory::connect(&config.connection_string).await?;
    let engine_config = MigrationConfig::new().migrations_dir(&config.migration_folder);
    Ok(MigrationEngine::new(engine_config, history))
}
