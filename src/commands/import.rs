//! The import command handler.

use crate::args::ImportArgs;
use crate::backup::PRE_IMPORT;
use crate::commands::{receipts_noun, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::Receipt;
use crate::{utils, Config, Result};
use anyhow::Context;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Reads a JSON array of receipt records from the file in `args`, or from stdin, and stores them.
/// Each stored receipt gets a new ID; the IDs are returned in input order.
///
/// With `--replace`, every existing receipt is first saved to a backup and then deleted. The
/// deletion and all of the inserts happen in one transaction, so a failed import changes nothing.
pub async fn import(config: Config, args: ImportArgs) -> Result<Out<Vec<String>>> {
    let json = match args.file() {
        Some(path) => utils::read(path).await.pub_result(ErrorType::Io)?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Unable to read receipts from stdin")
                .pub_result(ErrorType::Io)?;
            buf
        }
    };
    let receipts: Vec<Receipt> = serde_json::from_str(&json)
        .context("The input is not a JSON array of receipt records")
        .pub_result(ErrorType::Request)?;
    debug!("Parsed {} receipt records", receipts.len());

    if args.replace() {
        let existing = config
            .db()
            .all_receipts()
            .await
            .pub_result(ErrorType::Database)?;
        let backup = config.backup();
        let path = backup
            .save_json(PRE_IMPORT, &existing)
            .await
            .pub_result(ErrorType::Io)?;
        backup.copy_sqlite().await.pub_result(ErrorType::Io)?;
        info!("Saved {} to {}", receipts_noun(existing.len()), path.display());
    }

    let ids = config
        .db()
        .insert_receipts(&receipts, args.replace())
        .await
        .pub_result(ErrorType::Database)?;

    Ok(Out::new(format!("Imported {}", receipts_noun(ids.len())), ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    const RECORDS: &str = r#"[
        {
            "fileName": "lunch.jpg",
            "merchant": "Deli",
            "date": "2024-01-02",
            "total": 18.75,
            "category": "Meals & Entertainment",
            "lineItems": [{"description": "Sandwich", "unitPrice": 18.75, "total": 18.75}],
            "createdAt": "2024-01-02T12:00:00Z"
        },
        {
            "fileName": "blurry.jpg",
            "status": "failed",
            "error": "Could not read the image",
            "createdAt": "2024-01-03T08:30:00Z"
        }
    ]"#;

    #[tokio::test]
    async fn test_import_from_file() {
        let env = TestEnv::new().await;
        let path = env.scratch().join("receipts.json");
        utils::write(&path, RECORDS).await.unwrap();

        let out = import(env.config(), ImportArgs::new(Some(path), false))
            .await
            .unwrap();
        assert_eq!(out.message(), "Imported 2 receipts");
        let ids = out.structure().unwrap();
        assert_eq!(ids.len(), 2);

        let deli = env.config().db().get_receipt(&ids[0]).await.unwrap().unwrap();
        assert_eq!(deli.merchant.as_deref(), Some("Deli"));
        assert_eq!(deli.line_items[0].quantity, 1);
        let failed = env.config().db().get_receipt(&ids[1]).await.unwrap().unwrap();
        assert!(!failed.is_completed());
        assert_eq!(failed.error.as_deref(), Some("Could not read the image"));
    }

    #[tokio::test]
    async fn test_import_replace_backs_up_first() {
        let env = TestEnv::new().await;
        let before = env.insert_sample_receipts().await;
        let path = env.scratch().join("receipts.json");
        utils::write(&path, RECORDS).await.unwrap();

        import(env.config(), ImportArgs::new(Some(path), true))
            .await
            .unwrap();
        assert_eq!(env.config().db().count_receipts().await.unwrap(), 2);

        let mut backups = Vec::new();
        let mut dir = utils::read_dir(env.config().backups()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            backups.push(entry.path());
        }
        backups.sort();
        assert_eq!(backups.len(), 2);
        let json_backup = backups
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "json"))
            .unwrap();
        let saved: Vec<Receipt> = utils::deserialize(json_backup).await.unwrap();
        assert_eq!(saved, before);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_json() {
        let env = TestEnv::new().await;
        let path = env.scratch().join("receipts.json");
        utils::write(&path, r#"{"not": "an array"}"#).await.unwrap();
        let err = import(env.config(), ImportArgs::new(Some(path), false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "request error");
        assert_eq!(env.config().db().count_receipts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_missing_file_is_io_error() {
        let env = TestEnv::new().await;
        let path = env.scratch().join("nope.json");
        let err = import(env.config(), ImportArgs::new(Some(path), false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "io error");
    }
}
