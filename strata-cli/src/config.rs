//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Default config file name, looked up when `--config` names a directory
pub const CONFIG_FILE_NAME: &str = "strata.json";

/// strata CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the migrations tree
    pub migration_folder: PathBuf,

    /// SQLite connection string
    pub connection_string: String,
}

impl Config {
    /// Load configuration from a file or from `strata.json` inside a directory.
    ///
    /// A relative `migrationFolder` is resolved against the directory holding
    /// the configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let file = Self::locate(path);
        let content = std::fs::read_to_string(&file).map_err(|e| {
            CliError::config(format!("cannot read '{}': {}", file.display(), e))
        })?;

        let mut config = Self::parse(&file, &content)?;
        config.validate()?;

        if config.migration_folder.is_relative() {
            let base = file.parent().unwrap_or_else(|| Path::new("."));
            config.migration_folder = base.join(&config.migration_folder);
        }

        Ok(config)
    }

    /// Resolve `--config` to the configuration file path.
    pub fn locate(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        }
    }

    fn parse(file: &Path, content: &str) -> CliResult<Self> {
        let is_toml = file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.migration_folder.as_os_str().is_empty() {
            return Err(CliError::config("migrationFolder must not be empty"));
        }
        if self.connection_string.trim().is_empty() {
            return Err(CliError::config("connectionString must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            CONFIG_FILE_NAME,
            r#"{ "migrationFolder": "migrations", "connectionString": ":memory:" }"#,
        );

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.migration_folder, dir.path().join("migrations"));
        assert_eq!(config.connection_string, ":memory:");
    }

    #[test]
    fn test_absolute_folder_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "custom.json",
            r#"{ "migrationFolder": "/srv/migrations", "connectionString": "app.db" }"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.migration_folder, PathBuf::from("/srv/migrations"));
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "strata.toml",
            "migrationFolder = \"db\"\nconnectionString = \"sqlite://app.db\"\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.migration_folder, dir.path().join("db"));
        assert_eq!(config.connection_string, "sqlite://app.db");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_missing_key() {
        let dir = TempDir::new().unwrap();
        write(&dir, CONFIG_FILE_NAME, r#"{ "migrationFolder": "migrations" }"#);

        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("connectionString"));
    }

    #[test]
    fn test_empty_values_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            CONFIG_FILE_NAME,
            r#"{ "migrationFolder": "migrations", "connectionString": "  " }"#,
        );
        assert!(Config::load(dir.path()).is_err());

        write(
            &dir,
            CONFIG_FILE_NAME,
            r#"{ "migrationFolder": "", "connectionString": "app.db" }"#,
        );
        assert!(Config::load(dir.path()).is_err());
    }
}
