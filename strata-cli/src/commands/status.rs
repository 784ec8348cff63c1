//! `strata status` command - Show pending migrations without applying them.

use std::path::Path;

use strata_migrate::SchemaState;

use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, kv, success, warn};

/// Run the status command
pub async fn run(config_path: &Path) -> CliResult<()> {
    output::header("Migration Status");

    let config = Config::load(config_path)?;
    super::print_config(&config);

    let engine = super::open_engine(&config).await?;
    let status = engine.status().await?;

    let schema = match status.schema {
        SchemaState::Ready => "ready",
        SchemaState::Missing => "not created",
        SchemaState::Partial => "inconsistent, will be recreated",
    };
    kv("History tables", schema);
    kv("Groups on disk", &status.scanned_groups.to_string());
    kv("Groups recorded", &status.recorded_groups.to_string());
    output::newline();

    for warning in &status.warnings {
        warn(&warning.to_string());
    }

    if status.is_up_to_date() {
        success("All migrations are up to date");
        return Ok(());
    }

    for group in &status.plan.groups {
        let detail = match group.group_id {
            Some(id) => format!("group {}", id),
            None => "new".to_string(),
        };
        output::group(&group.name, &detail);
        for unit in &group.units {
            output::pending_unit(&unit.name);
        }
    }

    output::newline();
    output::info(&status.plan.summary());

    Ok(())
}
