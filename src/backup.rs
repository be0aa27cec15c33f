//! Backups written to `$RECEIPTS_HOME/.backups` before destructive operations.

use crate::model::Receipt;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;

/// Prefix for the JSON snapshot taken before receipts are deleted.
pub const PRE_DELETE: &str = "pre-delete";

/// Prefix for the JSON snapshot taken before an import replaces every receipt.
pub const PRE_IMPORT: &str = "pre-import";

/// Prefix for SQLite backup files.
pub const SQLITE: &str = "receipts.sqlite";

/// Manages backup file creation and rotation.
///
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
    sqlite_path: PathBuf,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            sqlite_path: config.sqlite_path().to_path_buf(),
        }
    }

    /// Saves `receipts` as a pretty-printed JSON array, the same shape `import` reads.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Old backups with the same prefix are rotated so that only `backup_copies` remain.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json(&self, prefix: &str, receipts: &[Receipt]) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date, "json").await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}.json"));

        let json =
            serde_json::to_string_pretty(receipts).context("Failed to serialize receipts")?;
        utils::write(&path, json).await?;
        self.rotate(prefix, "json").await?;
        Ok(path)
    }

    /// Copies the SQLite database file to the backups directory as
    /// `receipts.sqlite.YYYY-MM-DD-NNN`, rotating old copies.
    pub async fn copy_sqlite(&self) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(SQLITE, &date, "").await?;
        let path = self.backups_dir.join(format!("{SQLITE}.{date}-{seq:03}"));

        utils::copy(&self.sqlite_path, &path).await?;
        self.rotate(SQLITE, "").await?;
        Ok(path)
    }

    /// Existing file names in the backups directory.
    async fn file_names(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut names = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            names.push((entry.path(), entry.file_name().to_string_lossy().to_string()));
        }
        Ok(names)
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str, extension: &str) -> Result<u32> {
        let max_seq = self
            .file_names()
            .await?
            .iter()
            .filter_map(|(_, name)| parse_sequence_number(name, prefix, date, extension))
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    /// Deletes the oldest files with `prefix` beyond `backup_copies`.
    async fn rotate(&self, prefix: &str, extension: &str) -> Result<()> {
        let mut files: Vec<_> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|(_, name)| is_backup_file(name, prefix, extension))
            .collect();

        // The name format makes name order the same as date and sequence order.
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses `NNN` out of `{prefix}.{date}-NNN[.{extension}]`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str, extension: &str) -> Option<u32> {
    let remainder = filename.strip_prefix(&format!("{prefix}.{date}-"))?;
    let seq = if extension.is_empty() {
        remainder
    } else {
        remainder.strip_suffix(&format!(".{extension}"))?
    };
    seq.parse().ok()
}

fn is_backup_file(filename: &str, prefix: &str, extension: &str) -> bool {
    let starts_ok = filename.starts_with(&format!("{prefix}."));
    let ends_ok = if extension.is_empty() {
        !filename.ends_with(".json")
    } else {
        filename.ends_with(&format!(".{extension}"))
    };
    starts_ok && ends_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number(
                "pre-delete.2025-12-14-001.json",
                PRE_DELETE,
                "2025-12-14",
                "json"
            ),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number(
                "receipts.sqlite.2025-12-14-003",
                SQLITE,
                "2025-12-14",
                ""
            ),
            Some(3)
        );
        assert_eq!(
            parse_sequence_number(
                "pre-import.2025-12-14-001.json",
                PRE_DELETE,
                "2025-12-14",
                "json"
            ),
            None
        );
        assert_eq!(
            parse_sequence_number(
                "pre-delete.2025-12-13-001.json",
                PRE_DELETE,
                "2025-12-14",
                "json"
            ),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file(
            "pre-delete.2025-12-14-001.json",
            PRE_DELETE,
            "json"
        ));
        assert!(is_backup_file(
            "receipts.sqlite.2025-12-14-001",
            SQLITE,
            ""
        ));
        assert!(!is_backup_file(
            "pre-delete.2025-12-14-001.json",
            PRE_IMPORT,
            "json"
        ));
        assert!(!is_backup_file(
            "receipts.sqlite.2025-12-14-001.json",
            SQLITE,
            ""
        ));
    }

    #[tokio::test]
    async fn test_save_json_rotates() {
        let env = TestEnv::new().await;
        let receipts = env.insert_sample_receipts().await;
        let backup = env.config().backup();

        let mut paths = Vec::new();
        for _ in 0..7 {
            paths.push(backup.save_json(PRE_DELETE, &receipts).await.unwrap());
        }
        backup.copy_sqlite().await.unwrap();

        let names: Vec<String> = backup
            .file_names()
            .await
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| name.starts_with(PRE_DELETE))
            .collect();
        assert_eq!(names.len(), env.config().backup_copies() as usize);
        assert!(!paths[0].exists());
        assert!(paths[6].exists());

        let saved: Vec<Receipt> = utils::deserialize(&paths[6]).await.unwrap();
        assert_eq!(saved, receipts);
    }
}
