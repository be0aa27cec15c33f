//! Configuration file handling.
//!
//! The configuration file is stored at `$RECEIPTS_HOME/config.json` and holds the subscription
//! plan and backup settings. The receipts database and backups live alongside it.

use crate::backup::Backup;
use crate::db::Db;
use crate::model::PlanTier;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "receipts";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const RECEIPTS_SQLITE: &str = "receipts.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$RECEIPTS_HOME` and from there it loads `$RECEIPTS_HOME/config.json`. It provides
/// paths to the other items expected in the home directory, and the open database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the home directory and its subdirectories, writes an initial `config.json` for
    /// `plan` and creates an empty database.
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a database, or if any file operation
    ///   fails.
    pub async fn create(dir: impl Into<PathBuf>, plan: PlanTier) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the receipts home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!("'{}' is already initialized", root.display())
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_file = ConfigFile {
            plan,
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(RECEIPTS_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `receipts_home` and its config file exist
    /// - load the config file
    /// - validate that the backups directory exists
    /// - open the database, upgrading its schema if needed
    pub async fn load(receipts_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = receipts_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The receipts home directory is missing, run 'receipts init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let sqlite_path = root.join(RECEIPTS_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn plan(&self) -> PlanTier {
        self.config_file.plan
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "receipts",
///   "config_version": 1,
///   "plan": "basic",
///   "backup_copies": 5
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "receipts"
    app_name: String,

    config_version: u8,

    /// The subscription plan, which sets the monthly receipt limit
    #[serde(default)]
    plan: PlanTier,

    /// Number of backup copies to keep per backup kind
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            plan: PlanTier::default(),
            backup_copies: BACKUP_COPIES,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path`, checking that it belongs to this application.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Unsupported config_version {}, the newest supported is {CONFIG_VERSION}",
            config.config_version
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("receipts_home");

        let created = Config::create(&home, PlanTier::Basic).await.unwrap();
        assert!(created.backups().is_dir());
        assert!(created.sqlite_path().is_file());
        assert!(created.config_path().is_file());

        let loaded = Config::load(&home).await.unwrap();
        assert_eq!(loaded.plan(), PlanTier::Basic);
        assert_eq!(loaded.backup_copies(), BACKUP_COPIES);
        assert_eq!(loaded.root(), created.root());
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), PlanTier::Free).await.unwrap();
        assert!(Config::create(dir.path(), PlanTier::Free).await.is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nothing-here")).await.unwrap_err();
        assert!(err.to_string().contains("receipts init"));
    }

    #[tokio::test]
    async fn test_config_load_missing_backups() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), PlanTier::Free).await.unwrap();
        tokio::fs::remove_dir(config.backups()).await.unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("backups directory is missing"));
    }

    #[tokio::test]
    async fn test_config_file_minimal_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        utils::write(&path, r#"{"app_name": "receipts", "config_version": 1}"#)
            .await
            .unwrap();
        let config = ConfigFile::load(&path).await.unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[tokio::test]
    async fn test_config_file_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        utils::write(
            &path,
            r#"{"app_name": "expenses", "config_version": 1, "backup_copies": 5}"#,
        )
        .await
        .unwrap();
        let err = ConfigFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_JSON);
        let original = ConfigFile {
            plan: PlanTier::Pro,
            backup_copies: 2,
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        let json = utils::read(&path).await.unwrap();
        assert!(json.contains("\"plan\": \"pro\""));
        assert_eq!(ConfigFile::load(&path).await.unwrap(), original);
    }
}
