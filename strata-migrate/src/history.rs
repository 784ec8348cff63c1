//! Migration history tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::MigrateResult;
use crate::plan::PlannedGroup;

/// History-side projection of a group: its identifier and how many units
/// have been recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Identifier generated when the group was first persisted.
    pub group_id: i64,
    /// Group directory name.
    pub name: String,
    /// Number of units recorded for the group.
    pub unit_count: usize,
}

impl GroupSummary {
    /// Create a new summary.
    pub fn new(group_id: i64, name: impl Into<String>, unit_count: usize) -> Self {
        Self {
            group_id,
            name: name.into(),
            unit_count,
        }
    }
}

/// A persisted unit execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Owning group identifier.
    pub group_id: i64,
    /// Owning group name.
    pub group: String,
    /// Unit file name.
    pub unit: String,
    /// When the unit was applied.
    pub executed_at: DateTime<Utc>,
}

/// State of the history tables before bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Neither table exists.
    Missing,
    /// Exactly one of the two tables exists.
    Partial,
    /// Both tables exist.
    Ready,
}

/// What [`HistoryStore::ensure_schema`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaBootstrap {
    /// Both tables already existed.
    Existing,
    /// Both tables were created from scratch.
    Created,
    /// An inconsistent schema was dropped and recreated.
    Recreated,
}

impl SchemaBootstrap {
    /// Bootstrap outcome for a detected state.
    pub fn for_state(state: SchemaState) -> Self {
        match state {
            SchemaState::Ready => Self::Existing,
            SchemaState::Partial => Self::Recreated,
            SchemaState::Missing => Self::Created,
        }
    }
}

/// A group whose pending units were applied and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedGroup {
    /// Group identifier, newly generated for groups seen for the first time.
    pub group_id: i64,
    /// Group name.
    pub name: String,
    /// Applied unit names in execution order.
    pub units: Vec<String>,
    /// Whether the group row was created in this batch.
    pub created: bool,
}

/// Persisted record of executed groups and units.
///
/// Implementations own the database connection. Nothing else writes to the
/// history tables.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Report which history tables exist without changing anything.
    async fn inspect_schema(&self) -> MigrateResult<SchemaState>;

    /// Make sure both history tables exist.
    ///
    /// A partial schema is dropped and recreated. Runs in its own transaction,
    /// committed before any migration work starts.
    async fn ensure_schema(&self) -> MigrateResult<SchemaBootstrap>;

    /// Per-group unit counts for every persisted group.
    async fn summarize_groups(&self) -> MigrateResult<Vec<GroupSummary>>;

    /// Names of the units recorded for a group.
    async fn list_unit_names(&self, group_id: i64) -> MigrateResult<Vec<String>>;

    /// Every recorded unit, in execution order.
    async fn list_records(&self) -> MigrateResult<Vec<UnitRecord>>;

    /// Apply and record a batch of planned groups as one transaction.
    ///
    /// Either every unit of every group is applied and recorded, or nothing
    /// is. The token is checked before each unit and before commit.
    async fn apply_batch(
        &self,
        groups: Vec<PlannedGroup>,
        cancel: CancellationToken,
    ) -> MigrateResult<Vec<AppliedGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_for_state() {
        assert_eq!(
            SchemaBootstrap::for_state(SchemaState::Ready),
            SchemaBootstrap::Existing
        );
        assert_eq!(
            SchemaBootstrap::for_state(SchemaState::Partial),
            SchemaBootstrap::Recreated
        );
        assert_eq!(
            SchemaBootstrap::for_state(SchemaState::Missing),
            SchemaBootstrap::Created
        );
    }
}
