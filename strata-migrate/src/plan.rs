//! Execution planning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{MigrateResult, MigrationError};
use crate::history::HistoryStore;
use crate::reconcile::{Candidate, Warning};
use crate::scan::MigrationScanner;

/// Format a count with its noun, adding a plural `s` unless `n` is one.
pub fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

/// A unit confirmed as not yet applied.
///
/// Holds only the file location. The file is opened when its content is
/// read and closed again before the read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnit {
    /// Unit file name.
    pub name: String,
    /// Location of the unit file.
    pub path: PathBuf,
}

impl PendingUnit {
    /// Create a pending unit.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Read the unit's SQL.
    ///
    /// Blocking; called from the database thread while the batch
    /// transaction is open.
    pub fn read_sql(&self) -> MigrateResult<String> {
        std::fs::read_to_string(&self.path).map_err(|e| MigrationError::io(&self.path, e))
    }
}

/// A group with the units that still have to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    /// Identifier from history, `None` until the group is first persisted.
    pub group_id: Option<i64>,
    /// Group name.
    pub name: String,
    /// Pending units in execution order.
    pub units: Vec<PendingUnit>,
}

impl PlannedGroup {
    /// Unit names in execution order.
    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.name.as_str()).collect()
    }
}

/// The per-run list of groups and units to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Groups in execution order.
    pub groups: Vec<PlannedGroup>,
    /// Warnings raised while planning.
    pub warnings: Vec<Warning>,
}

impl ExecutionPlan {
    /// Check if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of pending units.
    pub fn unit_count(&self) -> usize {
        self.groups.iter().map(|group| group.units.len()).sum()
    }

    /// Get a summary of the plan.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            "No pending units".to_string()
        } else {
            format!(
                "{} in {}",
                counted(self.unit_count(), "pending unit"),
                counted(self.groups.len(), "group")
            )
        }
    }
}

/// Turns reconciliation candidates into an [`ExecutionPlan`].
pub struct Planner<'a, H: HistoryStore + ?Sized> {
    history: &'a H,
    scanner: &'a MigrationScanner,
}

impl<'a, H: HistoryStore + ?Sized> Planner<'a, H> {
    /// Create a planner over a history store and migrations root.
    pub fn new(history: &'a H, scanner: &'a MigrationScanner) -> Self {
        Self { history, scanner }
    }

    /// Plan every candidate, in order.
    pub async fn plan(&self, candidates: &[Candidate]) -> MigrateResult<ExecutionPlan> {
        let mut plan = ExecutionPlan::default();

        for candidate in candidates {
            let group = self.plan_group(candidate).await?;
            if group.units.is_empty() {
                // Candidates only get here with more units on disk than
                // recorded, so an empty diff means history disagrees with itself.
                tracing::warn!(group = %candidate.name, "Candidate group has no pending units");
                plan.warnings.push(Warning::NothingPending {
                    name: candidate.name.clone(),
                });
                continue;
            }

            tracing::debug!(
                group = %group.name,
                group_id = ?group.group_id,
                pending = group.units.len(),
                "Planned group"
            );
            plan.groups.push(group);
        }

        Ok(plan)
    }

    /// Diff one candidate against its recorded unit names.
    pub async fn plan_group(&self, candidate: &Candidate) -> MigrateResult<PlannedGroup> {
        let recorded: HashSet<String> = match candidate.group_id {
            Some(group_id) => self
                .history
                .list_unit_names(group_id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let mut units = Vec::new();
        for name in &candidate.units {
            if recorded.contains(name) {
                continue;
            }

            let path = self.scanner.unit_path(&candidate.name, name);
            ensure_readable(&path).await?;
            units.push(PendingUnit::new(name.clone(), path));
        }

        Ok(PlannedGroup {
            group_id: candidate.group_id,
            name: candidate.name.clone(),
            units,
        })
    }
}

/// Open and immediately release a unit file so unreadable units fail the
/// run before any transaction starts.
async fn ensure_readable(path: &Path) -> MigrateResult<()> {
    tokio::fs::File::open(path)
        .await
        .map(drop)
        .map_err(|e| MigrationError::io(path, e))
}
