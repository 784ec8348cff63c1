//! `strata history` command - List applied migration units.

use std::path::Path;

use strata_migrate::{HistoryStore, SchemaState, counted};
use strata_sqlite::SqliteHistory;

use crate::cli::HistoryArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output;

/// Run the history command
pub async fn run(config_path: &Path, args: HistoryArgs) -> CliResult<()> {
    output::header("Migration History");

    let config = Config::load(config_path)?;
    let history = SqliteHistory::connect(&config.connection_string).await?;

    if history.inspect_schema().await? != SchemaState::Ready {
        output::info("No migration history recorded yet");
        return Ok(());
    }

    let records: Vec<_> = history
        .list_records()
        .await?
        .into_iter()
        .filter(|record| args.group.as_ref().is_none_or(|group| &record.group == group))
        .collect();

    if records.is_empty() {
        output::info("No applied units");
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for record in &records {
        if current != Some(record.group.as_str()) {
            if current.is_some() {
                output::newline();
            }
            output::group(&record.group, &format!("group {}", record.group_id));
            current = Some(record.group.as_str());
        }
        let at = record.executed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        output::applied_unit(&record.unit, Some(&at));
    }

    output::newline();
    output::dim(&counted(records.len(), "applied unit"));

    Ok(())
}
