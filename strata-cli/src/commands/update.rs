//! `strata update` command - Apply pending migrations.

use std::path::Path;

use strata_migrate::SchemaBootstrap;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the update command
pub async fn run(config_path: &Path, cancel: CancellationToken) -> CliResult<()> {
    output::header("Update");

    output::step(1, 2, "Loading configuration...");
    let config = Config::load(config_path)?;
    super::print_config(&config);

    output::step(2, 2, "Applying migrations...");
    let engine = super::open_engine(&config).await?;
    let report = engine.update(&cancel).await?;

    match report.bootstrap {
        SchemaBootstrap::Existing => {}
        SchemaBootstrap::Created => output::info("Created migration history tables"),
        SchemaBootstrap::Recreated => {
            warn("Migration history tables were inconsistent and have been recreated")
        }
    }

    for warning in &report.warnings {
        warn(&warning.to_string());
    }

    if !report.applied.is_empty() {
        output::newline();
        for group in &report.applied {
            let detail = if group.created {
                format!("new group {}", group.group_id)
            } else {
                format!("group {}", group.group_id)
            };
            output::group(&group.name, &detail);
            for unit in &group.units {
                output::applied_unit(unit, None);
            }
        }
    }

    output::newline();
    success(&report.summary());

    Ok(())
}
