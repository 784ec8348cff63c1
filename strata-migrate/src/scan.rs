//! Migrations folder scanning.
//!
//! The migrations root has exactly two levels:
//!
//! ```text
//! migrations/
//! ├── 001_core/
//! │   ├── 01_users.sql
//! │   └── 02_sessions.sql
//! └── 002_billing/
//!     └── 01_invoices.sql
//! ```
//!
//! Every entry of the root is a group directory and every entry of a group
//! directory is a `.sql` unit file. Anything else aborts the scan.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{MigrateResult, MigrationError};

/// File extension that marks a migration unit.
pub const UNIT_EXTENSION: &str = "sql";

/// Groups found on disk, in execution order, each with its ordered unit names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    groups: IndexMap<String, Vec<String>>,
}

impl ScanResult {
    /// Create an empty scan result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group. A repeated name replaces the earlier unit list.
    pub fn insert(&mut self, group: impl Into<String>, units: Vec<String>) {
        self.groups.insert(group.into(), units);
    }

    /// Unit names of a group, if the group exists on disk.
    pub fn units(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Check whether a group exists on disk.
    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Iterate groups in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, units)| (name.as_str(), units.as_slice()))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if no groups were found.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of units across all groups.
    pub fn unit_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl<G, U> FromIterator<(G, Vec<U>)> for ScanResult
where
    G: Into<String>,
    U: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (G, Vec<U>)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (group, units) in iter {
            result.insert(group, units.into_iter().map(Into::into).collect());
        }
        result
    }
}

/// Reads the migrations root.
#[derive(Debug, Clone)]
pub struct MigrationScanner {
    root: PathBuf,
}

impl MigrationScanner {
    /// Create a scanner for a migrations root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the migrations root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a unit file.
    pub fn unit_path(&self, group: &str, unit: &str) -> PathBuf {
        self.root.join(group).join(unit)
    }

    /// Scan the migrations root.
    ///
    /// The root is validated in full before any group is read, so a stray file
    /// at the top level is reported even when a group is also malformed.
    /// Groups and units are ordered by name. Unit contents are never opened.
    pub async fn scan(&self) -> MigrateResult<ScanResult> {
        let mut groups = Vec::new();
        for (name, path) in list_sorted(&self.root).await? {
            if !is_dir(&path).await? {
                return Err(MigrationError::OnlyDirectoriesAllowed { path });
            }
            let name = name.into_string().map_err(|_| {
                let cause = io::Error::new(io::ErrorKind::InvalidData, "group name is not UTF-8");
                MigrationError::io(&path, cause)
            })?;
            groups.push((name, path));
        }

        let mut result = ScanResult::new();
        for (group, group_path) in groups {
            let mut units = Vec::new();
            for (unit, unit_path) in list_sorted(&group_path).await? {
                let unit = match unit.into_string() {
                    Ok(unit) if is_unit_file(&unit) && !is_dir(&unit_path).await? => unit,
                    _ => {
                        return Err(MigrationError::OnlyUnitFilesAllowed {
                            group,
                            path: unit_path,
                        });
                    }
                };
                units.push(unit);
            }

            tracing::debug!(group = %group, units = units.len(), "Scanned group");
            result.insert(group, units);
        }

        Ok(result)
    }
}

/// List a directory's entries ordered by file name.
async fn list_sorted(dir: &Path) -> MigrateResult<Vec<(OsString, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| MigrationError::io(dir, e))?;

    let mut listed = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MigrationError::io(dir, e))?
    {
        listed.push((entry.file_name(), entry.path()));
    }

    listed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listed)
}

/// Follows symlinks, so a linked group directory counts as a directory.
async fn is_dir(path: &Path) -> MigrateResult<bool> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| MigrationError::io(path, e))?;
    Ok(metadata.is_dir())
}

/// A unit is any file name ending in `.sql`, including a bare `.sql`.
fn is_unit_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, extension)| extension == UNIT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_scan_orders_groups_and_units() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "002_billing/01_invoices.sql", "SELECT 1;");
        write(dir.path(), "001_core/02_sessions.sql", "SELECT 1;");
        write(dir.path(), "001_core/01_users.sql", "SELECT 1;");

        let result = MigrationScanner::new(dir.path()).scan().await.unwrap();

        let groups: Vec<_> = result.iter().map(|(name, _)| name).collect();
        assert_eq!(groups, vec!["001_core", "002_billing"]);
        assert_eq!(
            result.units("001_core").unwrap(),
            &["01_users.sql".to_string(), "02_sessions.sql".to_string()]
        );
        assert_eq!(result.unit_count(), 3);
    }

    #[tokio::test]
    async fn test_scan_empty_group() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();

        let result = MigrationScanner::new(dir.path()).scan().await.unwrap();
        assert_eq!(result.units("empty"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_scan_rejects_root_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001_core/01_users.sql", "SELECT 1;");
        write(dir.path(), "README.md", "notes");

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert!(matches!(err, MigrationError::OnlyDirectoriesAllowed { .. }));
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[tokio::test]
    async fn test_scan_root_checked_before_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001_core/notes.txt", "notes");
        write(dir.path(), "zz.sql", "SELECT 1;");

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert!(matches!(err, MigrationError::OnlyDirectoriesAllowed { .. }));
    }

    #[tokio::test]
    async fn test_scan_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001_core/01_users.sql", "SELECT 1;");
        write(dir.path(), "001_core/notes.txt", "notes");

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        match err {
            MigrationError::OnlyUnitFilesAllowed { group, path } => {
                assert_eq!(group, "001_core");
                assert!(path.ends_with("notes.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_scan_rejects_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001_core/nested/01_users.sql", "SELECT 1;");

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert_eq!(err.group(), Some("001_core"));
    }

    #[tokio::test]
    async fn test_scan_rejects_directory_named_like_unit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("001_core/01_users.sql")).unwrap();

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert!(matches!(err, MigrationError::OnlyUnitFilesAllowed { .. }));
    }

    #[test]
    fn test_is_unit_file() {
        assert!(is_unit_file("01_users.sql"));
        assert!(is_unit_file(".sql"));
        assert!(is_unit_file("v1.2.sql"));
        assert!(!is_unit_file("sql"));
        assert!(!is_unit_file("01_users.SQL"));
        assert!(!is_unit_file("01_users.sql.bak"));
    }

    #[tokio::test]
    async fn test_scan_accepts_bare_extension_unit() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001_core/.sql", "SELECT 1;");

        let result = MigrationScanner::new(dir.path()).scan().await.unwrap();
        assert_eq!(result.units("001_core").unwrap(), &[".sql".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_rejects_non_utf8_unit_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("001_core")).unwrap();
        let name = OsStr::from_bytes(b"01_\xff.sql");
        std::fs::write(dir.path().join("001_core").join(name), "SELECT 1;").unwrap();

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert!(matches!(err, MigrationError::OnlyUnitFilesAllowed { .. }));
        assert_eq!(err.group(), Some("001_core"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_rejects_non_utf8_group_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(OsStr::from_bytes(b"core_\xfe"))).unwrap();

        let err = MigrationScanner::new(dir.path()).scan().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = MigrationScanner::new(dir.path().join("missing"))
            .scan()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_scan_result_from_iter() {
        let result: ScanResult = [("a", vec!["1.sql", "2.sql"]), ("b", vec![])]
            .into_iter()
            .collect();
        assert_eq!(result.len(), 2);
        assert!(result.contains("b"));
        assert_eq!(result.unit_count(), 2);
    }
}
