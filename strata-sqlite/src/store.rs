//! SQLite-backed migration history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use strata_migrate::{
    AppliedGroup, CancellationToken, GroupSummary, HistoryStore, MigrateResult, MigrationError,
    PlannedGroup, SchemaBootstrap, SchemaState, UnitRecord,
};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::SqliteConfig;
use crate::error::SqliteResult;
use crate::schema::{
    CREATE_SQL, DROP_SQL, EXISTING_TABLES_SQL, GROUP_TABLE, INSERT_GROUP_SQL, INSERT_UNIT_SQL,
    LIST_RECORDS_SQL, LIST_UNIT_NAMES_SQL, SUMMARIZE_SQL, UNIT_TABLE,
};

/// Migration history stored in two SQLite tables.
///
/// Holds a single connection; every query and the batch transaction run on
/// the connection's background thread.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Open a connection described by a connection string.
    pub async fn connect(connection_string: &str) -> SqliteResult<Self> {
        let config = SqliteConfig::parse(connection_string)?;
        Self::open(&config).await
    }

    /// Open a connection with the given configuration.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            crate::config::DatabasePath::Memory => Connection::open_in_memory().await?,
            crate::config::DatabasePath::File(path) => Connection::open(path).await?,
        };

        let init_sql = config.init_sql();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        debug!(path = ?config.path, "Opened SQLite connection");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> SqliteResult<Self> {
        Self::open(&SqliteConfig::memory()).await
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqliteHistory {
    async fn inspect_schema(&self) -> MigrateResult<SchemaState> {
        self.conn
            .call(|conn| Ok(schema_state(&existing_tables(conn)?)))
            .await
            .map_err(|e| MigrationError::history_read(e.to_string()))
    }

    async fn ensure_schema(&self) -> MigrateResult<SchemaBootstrap> {
        let state = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let state = schema_state(&existing_tables(&tx)?);
                match state {
                    SchemaState::Ready => {}
                    SchemaState::Partial => {
                        tx.execute_batch(DROP_SQL)?;
                        tx.execute_batch(CREATE_SQL)?;
                    }
                    SchemaState::Missing => tx.execute_batch(CREATE_SQL)?,
                }
                tx.commit()?;
                Ok(state)
            })
            .await
            .map_err(|e| MigrationError::schema(e.to_string()))?;

        match state {
            SchemaState::Ready => debug!("History tables present"),
            SchemaState::Partial => warn!(
                groups = GROUP_TABLE,
                units = UNIT_TABLE,
                "Inconsistent history schema, recreated tables"
            ),
            SchemaState::Missing => info!(
                groups = GROUP_TABLE,
                units = UNIT_TABLE,
                "Created history tables"
            ),
        }

        Ok(SchemaBootstrap::for_state(state))
    }

    async fn summarize_groups(&self) -> MigrateResult<Vec<GroupSummary>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(SUMMARIZE_SQL)?;
                let rows = stmt.query_map([], |row| {
                    let count: i64 = row.get(2)?;
                    Ok(GroupSummary::new(
                        row.get(0)?,
                        row.get::<_, String>(1)?,
                        count as usize,
                    ))
                })?;
                let summaries: Result<Vec<_>, _> = rows.collect();
                Ok(summaries?)
            })
            .await
            .map_err(|e| {
                MigrationError::history_read(format!("failed to summarize groups: {}", e))
            })
    }

    async fn list_unit_names(&self, group_id: i64) -> MigrateResult<Vec<String>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(LIST_UNIT_NAMES_SQL)?;
                let rows = stmt.query_map([group_id], |row| row.get(0))?;
                let names: Result<Vec<String>, _> = rows.collect();
                Ok(names?)
            })
            .await
            .map_err(|e| {
                MigrationError::history_read(format!(
                    "failed to list units of group {}: {}",
                    group_id, e
                ))
            })
    }

    async fn list_records(&self) -> MigrateResult<Vec<UnitRecord>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(LIST_RECORDS_SQL)?;
                let rows = stmt.query_map([], |row| {
                    Ok(UnitRecord {
                        group_id: row.get(0)?,
                        group: row.get(1)?,
                        unit: row.get(2)?,
                        executed_at: row.get::<_, DateTime<Utc>>(3)?,
                    })
                })?;
                let records: Result<Vec<_>, _> = rows.collect();
                Ok(records?)
            })
            .await
            .map_err(|e| MigrationError::history_read(e.to_string()))
    }

    async fn apply_batch(
        &self,
        groups: Vec<PlannedGroup>,
        cancel: CancellationToken,
    ) -> MigrateResult<Vec<AppliedGroup>> {
        self.conn
            .call(move |conn| Ok(apply_in_transaction(conn, &groups, &cancel)))
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?
    }
}

fn existing_tables(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(EXISTING_TABLES_SQL)?;
    let rows = stmt.query_map(params![GROUP_TABLE, UNIT_TABLE], |row| row.get(0))?;
    rows.collect()
}

fn schema_state(tables: &[String]) -> SchemaState {
    match tables.len() {
        0 => SchemaState::Missing,
        1 => SchemaState::Partial,
        _ => SchemaState::Ready,
    }
}

/// Turns any commit into a rollback while installed.
///
/// Keeps unit SQL from committing the batch transaction early or running
/// statements in autocommit mode after ending it.
struct CommitVeto<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> CommitVeto<'a> {
    fn install(conn: &'a rusqlite::Connection) -> Self {
        conn.commit_hook(Some(|| true));
        Self { conn }
    }
}

impl Drop for CommitVeto<'_> {
    fn drop(&mut self) {
        self.conn.commit_hook(None::<fn() -> bool>);
    }
}

/// Apply every group inside one transaction.
///
/// Returning early drops the transaction, which rolls it back.
fn apply_in_transaction(
    conn: &mut rusqlite::Connection,
    groups: &[PlannedGroup],
    cancel: &CancellationToken,
) -> MigrateResult<Vec<AppliedGroup>> {
    let tx = conn
        .transaction()
        .map_err(|e| MigrationError::database(format!("failed to start transaction: {}", e)))?;

    let veto = CommitVeto::install(&tx);
    let mut assigned: HashMap<&str, i64> = HashMap::new();
    let mut applied = Vec::with_capacity(groups.len());

    for group in groups {
        info!(group = %group.name, units = group.units.len(), "Executing group");

        for unit in &group.units {
            if cancel.is_cancelled() {
                warn!(group = %group.name, unit = %unit.name, "Cancelled, rolling back");
                return Err(MigrationError::Cancelled);
            }

            let sql = unit.read_sql()?;
            let executed = tx.execute_batch(&sql);

            // A unit must not end the batch transaction: COMMIT is vetoed by
            // the hook, ROLLBACK leaves the connection in autocommit mode.
            if tx.is_autocommit() {
                let cause = match executed {
                    Err(e) => format!("unit ended the enclosing transaction: {}", e),
                    Ok(()) => "unit ended the enclosing transaction".to_string(),
                };
                return Err(MigrationError::execution(&group.name, &unit.name, cause));
            }
            executed.map_err(|e| MigrationError::execution(&group.name, &unit.name, e))?;
            info!(group = %group.name, unit = %unit.name, "Executed unit");
        }

        let known = group
            .group_id
            .or_else(|| assigned.get(group.name.as_str()).copied());
        let (group_id, created) = match known {
            Some(id) => (id, false),
            None => {
                tx.execute(INSERT_GROUP_SQL, [&group.name])
                    .map_err(|e| MigrationError::history_write(&group.name, e))?;
                let id = tx.last_insert_rowid();
                assigned.insert(group.name.as_str(), id);
                debug!(group = %group.name, group_id = id, "Recorded new group");
                (id, true)
            }
        };

        let executed_at = Utc::now().to_rfc3339();
        {
            let mut stmt = tx
                .prepare_cached(INSERT_UNIT_SQL)
                .map_err(|e| MigrationError::history_write(&group.name, e))?;
            for unit in &group.units {
                stmt.execute(params![group_id, unit.name, executed_at])
                    .map_err(|e| MigrationError::history_write(&group.name, e))?;
            }
        }

        applied.push(AppliedGroup {
            group_id,
            name: group.name.clone(),
            units: group.units.iter().map(|unit| unit.name.clone()).collect(),
            created,
        });
    }

    if cancel.is_cancelled() {
        warn!("Cancelled before commit, rolling back");
        return Err(MigrationError::Cancelled);
    }

    drop(veto);
    tx.commit()
        .map_err(|e| MigrationError::database(format!("failed to commit: {}", e)))?;
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use strata_migrate::PendingUnit;

    use super::*;

    fn unit(dir: &Path, name: &str, sql: &str) -> PendingUnit {
        let path = dir.join(name);
        std::fs::write(&path, sql).unwrap();
        PendingUnit::new(name, path)
    }

    async fn table_count(history: &SqliteHistory) -> usize {
        history
            .connection()
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'strata_%'",
                    [],
                    |row| row.get::<_, i64>(0),
                )?)
            })
            .await
            .unwrap() as usize
    }

    #[test]
    fn test_schema_state() {
        assert_eq!(schema_state(&[]), SchemaState::Missing);
        assert_eq!(schema_state(&["strata_unit".to_string()]), SchemaState::Partial);
        assert_eq!(
            schema_state(&["strata_group".to_string(), "strata_unit".to_string()]),
            SchemaState::Ready
        );
    }

    #[tokio::test]
    async fn test_bootstrap_from_empty() {
        let history = SqliteHistory::open_in_memory().await.unwrap();

        assert_eq!(history.inspect_schema().await.unwrap(), SchemaState::Missing);
        assert_eq!(
            history.ensure_schema().await.unwrap(),
            SchemaBootstrap::Created
        );
        assert_eq!(table_count(&history).await, 2);
        assert_eq!(
            history.ensure_schema().await.unwrap(),
            SchemaBootstrap::Existing
        );
        assert_eq!(table_count(&history).await, 2);
    }

    #[tokio::test]
    async fn test_bootstrap_repairs_partial_schema() {
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history
            .connection()
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE strata_group (id INTEGER PRIMARY KEY, name TEXT);
                     INSERT INTO strata_group (name) VALUES ('stale');",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(history.inspect_schema().await.unwrap(), SchemaState::Partial);
        assert_eq!(
            history.ensure_schema().await.unwrap(),
            SchemaBootstrap::Recreated
        );
        assert_eq!(table_count(&history).await, 2);
        assert!(history.summarize_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_batch_records_units() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let group = PlannedGroup {
            group_id: None,
            name: "001_core".to_string(),
            units: vec![
                unit(dir.path(), "01.sql", "CREATE TABLE users (id INTEGER PRIMARY KEY);"),
                unit(
                    dir.path(),
                    "02.sql",
                    "INSERT INTO users (id) VALUES (1); INSERT INTO users (id) VALUES (2);",
                ),
            ],
        };

        let applied = history
            .apply_batch(vec![group], CancellationToken::new())
            .await
            .unwrap();
        assert!(applied[0].created);

        let summaries = history.summarize_groups().await.unwrap();
        assert_eq!(
            summaries,
            vec![GroupSummary::new(applied[0].group_id, "001_core", 2)]
        );
        assert_eq!(
            history.list_unit_names(applied[0].group_id).await.unwrap(),
            vec!["01.sql", "02.sql"]
        );

        let records = history.list_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].group, "001_core");
        assert_eq!(records[1].unit, "02.sql");
    }

    #[tokio::test]
    async fn test_apply_batch_rolls_back_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let good = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![unit(dir.path(), "a.sql", "CREATE TABLE a (id INTEGER);")],
        };
        let bad = PlannedGroup {
            group_id: None,
            name: "g2".to_string(),
            units: vec![unit(dir.path(), "b.sql", "CREATE TABLE b (id INTEGER")],
        };

        let err = history
            .apply_batch(vec![good, bad], CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            MigrationError::Execution { group, unit, .. } => {
                assert_eq!(group, "g2");
                assert_eq!(unit, "b.sql");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(history.summarize_groups().await.unwrap().is_empty());
        let tables: i64 = history
            .connection()
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'a'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(tables, 0);
    }

    async fn has_table(history: &SqliteHistory, name: &'static str) -> bool {
        let count: i64 = history
            .connection()
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [name],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        count == 1
    }

    #[tokio::test]
    async fn test_unit_commit_does_not_end_batch() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let committing = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![unit(dir.path(), "a.sql", "CREATE TABLE a (id INTEGER); COMMIT;")],
        };
        let broken = PlannedGroup {
            group_id: None,
            name: "g2".to_string(),
            units: vec![unit(dir.path(), "b.sql", "CREATE TABLE b (id INTEGER")],
        };

        let err = history
            .apply_batch(vec![committing, broken], CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), strata_migrate::ErrorKind::Execution);
        assert_eq!(err.group(), Some("g1"));
        assert!(err.to_string().contains("ended the enclosing transaction"));

        assert!(!has_table(&history, "a").await);
        assert!(history.list_records().await.unwrap().is_empty());

        // The connection commits normally again once the batch is over.
        let clean = PlannedGroup {
            group_id: None,
            name: "g3".to_string(),
            units: vec![unit(dir.path(), "c.sql", "CREATE TABLE c (id INTEGER);")],
        };
        history
            .apply_batch(vec![clean], CancellationToken::new())
            .await
            .unwrap();
        assert!(has_table(&history, "c").await);
    }

    #[tokio::test]
    async fn test_unit_rollback_does_not_end_batch() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let group = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![
                unit(dir.path(), "a.sql", "CREATE TABLE a (id INTEGER);"),
                unit(dir.path(), "b.sql", "ROLLBACK; CREATE TABLE b (id INTEGER);"),
            ],
        };

        let err = history
            .apply_batch(vec![group], CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), strata_migrate::ErrorKind::Execution);
        assert!(err.to_string().contains("b.sql"));

        assert!(!has_table(&history, "a").await);
        assert!(!has_table(&history, "b").await);
        assert!(history.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_batch_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let group = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![unit(dir.path(), "a.sql", "CREATE TABLE a (id INTEGER);")],
        };

        let err = history.apply_batch(vec![group], cancel).await.unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled));
        assert!(history.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_batch_reuses_id_for_repeated_name() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let first = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![unit(dir.path(), "a.sql", "SELECT 1;")],
        };
        let second = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![unit(dir.path(), "b.sql", "SELECT 1;")],
        };

        let applied = history
            .apply_batch(vec![first, second], CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(applied[0].group_id, applied[1].group_id);
        assert!(!applied[1].created);
    }

    #[tokio::test]
    async fn test_missing_unit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let history = SqliteHistory::open_in_memory().await.unwrap();
        history.ensure_schema().await.unwrap();

        let group = PlannedGroup {
            group_id: None,
            name: "g1".to_string(),
            units: vec![PendingUnit::new("gone.sql", dir.path().join("gone.sql"))],
        };

        let err = history
            .apply_batch(vec![group], CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), strata_migrate::ErrorKind::Io);
    }
}
