//! Migration engine implementation.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::history::{AppliedGroup, HistoryStore, SchemaBootstrap, SchemaState};
use crate::plan::{ExecutionPlan, Planner, counted};
use crate::reconcile::{Warning, reconcile};
use crate::scan::MigrationScanner;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Path to the migrations root.
    pub migrations_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations root.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }
}

/// Result of [`MigrationEngine::update`].
#[derive(Debug)]
pub struct UpdateReport {
    /// What schema bootstrap had to do.
    pub bootstrap: SchemaBootstrap,
    /// Groups applied in this run, in execution order.
    pub applied: Vec<AppliedGroup>,
    /// Non-fatal warnings.
    pub warnings: Vec<Warning>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl UpdateReport {
    /// Number of units applied.
    pub fn applied_count(&self) -> usize {
        self.applied.iter().map(|group| group.units.len()).sum()
    }

    /// Check if the run had nothing to apply.
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.applied.is_empty() {
            parts.push("all migrations are up to date".to_string());
        } else {
            parts.push(format!(
                "{} applied in {}",
                counted(self.applied_count(), "unit"),
                counted(self.applied.len(), "group")
            ));
        }

        if !self.warnings.is_empty() {
            parts.push(counted(self.warnings.len(), "warning"));
        }

        format!("{} in {}ms", parts.join(", "), self.duration_ms)
    }
}

/// Result of [`MigrationEngine::status`].
#[derive(Debug)]
pub struct StatusReport {
    /// State of the history tables.
    pub schema: SchemaState,
    /// Groups found on disk.
    pub scanned_groups: usize,
    /// Groups recorded in history.
    pub recorded_groups: usize,
    /// What an update would apply.
    pub plan: ExecutionPlan,
    /// Non-fatal warnings, reconciliation first.
    pub warnings: Vec<Warning>,
}

impl StatusReport {
    /// Check if an update would apply nothing.
    pub fn is_up_to_date(&self) -> bool {
        self.plan.is_empty()
    }
}

/// The main migration engine.
pub struct MigrationEngine<H: HistoryStore> {
    config: MigrationConfig,
    history: H,
    scanner: MigrationScanner,
}

impl<H: HistoryStore> MigrationEngine<H> {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig, history: H) -> Self {
        let scanner = MigrationScanner::new(&config.migrations_dir);
        Self {
            config,
            history,
            scanner,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the history store.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Bring the database up to date with the migrations folder.
    ///
    /// Bootstrap the history schema, scan, reconcile, plan and apply the plan
    /// as a single transaction. Idempotent: a second run without changes on
    /// disk applies nothing. Any error aborts the run and leaves history as it
    /// was before the batch started.
    pub async fn update(&self, cancel: &CancellationToken) -> MigrateResult<UpdateReport> {
        let start = Instant::now();

        let bootstrap = guarded(cancel, self.history.ensure_schema()).await?;
        match bootstrap {
            SchemaBootstrap::Existing => info!("Migration tables exist"),
            SchemaBootstrap::Created => info!("Created migration tables"),
            SchemaBootstrap::Recreated => {
                warn!("Inconsistent migration schema, dropped and recreated tables")
            }
        }

        let scan = guarded(cancel, self.scanner.scan()).await?;
        let summaries = guarded(cancel, self.history.summarize_groups()).await?;
        info!(
            scanned = scan.len(),
            recorded = summaries.len(),
            "Reconciling migrations folder with history"
        );

        let reconciliation = reconcile(&summaries, &scan);
        for warning in &reconciliation.warnings {
            warn!(group = %warning.group(), "{}", warning);
        }

        let mut warnings = reconciliation.warnings;
        let mut report = UpdateReport {
            bootstrap,
            applied: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        };

        if reconciliation.candidates.is_empty() {
            info!("All migrations are up to date");
            report.warnings = warnings;
            report.duration_ms = start.elapsed().as_millis() as i64;
            return Ok(report);
        }

        let planner = Planner::new(&self.history, &self.scanner);
        let plan = guarded(cancel, planner.plan(&reconciliation.candidates)).await?;
        warnings.extend(plan.warnings);

        if !plan.groups.is_empty() {
            if cancel.is_cancelled() {
                return Err(MigrationError::Cancelled);
            }

            info!(groups = plan.groups.len(), "Executing migrations");
            report.applied = self.history.apply_batch(plan.groups, cancel.clone()).await?;
        }

        report.warnings = warnings;
        report.duration_ms = start.elapsed().as_millis() as i64;
        info!(
            applied = report.applied_count(),
            duration_ms = report.duration_ms,
            "Migration run finished"
        );
        Ok(report)
    }

    /// Compute what [`update`](Self::update) would apply without changing
    /// anything, including the history schema.
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        let schema = self.history.inspect_schema().await?;
        let scan = self.scanner.scan().await?;

        let summaries = if schema == SchemaState::Ready {
            self.history.summarize_groups().await?
        } else {
            Vec::new()
        };

        let reconciliation = reconcile(&summaries, &scan);
        let planner = Planner::new(&self.history, &self.scanner);
        let mut plan = planner.plan(&reconciliation.candidates).await?;

        let mut warnings = reconciliation.warnings;
        warnings.append(&mut plan.warnings);

        Ok(StatusReport {
            schema,
            scanned_groups: scan.len(),
            recorded_groups: summaries.len(),
            plan,
            warnings,
        })
    }
}

/// Run a pipeline stage unless the token is cancelled first.
async fn guarded<T>(
    cancel: &CancellationToken,
    stage: impl Future<Output = MigrateResult<T>>,
) -> MigrateResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MigrationError::Cancelled),
        result = stage => result,
    }
}
