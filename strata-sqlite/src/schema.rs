//! History table definitions and queries.

/// Table holding one row per group.
pub const GROUP_TABLE: &str = "strata_group";

/// Table holding one row per applied unit.
pub const UNIT_TABLE: &str = "strata_unit";

/// Creates both history tables.
pub const CREATE_SQL: &str = r#"
CREATE TABLE strata_group (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE strata_unit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES strata_group (id),
    name TEXT NOT NULL,
    executed_at TEXT NOT NULL,
    UNIQUE (group_id, name)
);
"#;

/// Drops both history tables, units first.
pub const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS strata_unit;
DROP TABLE IF EXISTS strata_group;
"#;

pub(crate) const EXISTING_TABLES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2)";

/// LEFT JOIN so a group row without units still reports its identifier.
pub(crate) const SUMMARIZE_SQL: &str = r#"
SELECT g.id, g.name, COUNT(u.id)
FROM strata_group g
    LEFT JOIN strata_unit u ON u.group_id = g.id
GROUP BY g.id, g.name
ORDER BY g.id
"#;

pub(crate) const LIST_UNIT_NAMES_SQL: &str =
    "SELECT name FROM strata_unit WHERE group_id = ?1 ORDER BY id";

pub(crate) const LIST_RECORDS_SQL: &str = r#"
SELECT u.group_id, g.name, u.name, u.executed_at
FROM strata_unit u
    JOIN strata_group g ON g.id = u.group_id
ORDER BY u.id
"#;

pub(crate) const INSERT_GROUP_SQL: &str = "INSERT INTO strata_group (name) VALUES (?1)";

pub(crate) const INSERT_UNIT_SQL: &str =
    "INSERT INTO strata_unit (group_id, name, executed_at) VALUES (?1, ?2, ?3)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sql_has_both_tables() {
        assert!(CREATE_SQL.contains(GROUP_TABLE));
        assert!(CREATE_SQL.contains(UNIT_TABLE));
        assert!(CREATE_SQL.contains("name TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_drop_sql_drops_units_first() {
        let units = DROP_SQL.find(UNIT_TABLE).unwrap();
        let groups = DROP_SQL.find(GROUP_TABLE).unwrap();
        assert!(units < groups);
    }
}
