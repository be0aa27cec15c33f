use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::PlanTier;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory with:
/// - an initial `config.json` for `plan` along with default settings
/// - the `.backups` subdirectory
/// - an empty receipts database
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operation fails.
pub async fn init(receipts_home: &Path, plan: PlanTier) -> Result<Out<()>> {
    let config = Config::create(receipts_home, plan)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Created the receipts directory at {} on the {plan} plan",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, PlanTier::Pro).await.unwrap();
        assert!(out.message().contains("pro plan"));
        assert_eq!(Config::load(&home).await.unwrap().plan(), PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_init_twice_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), PlanTier::Free).await.unwrap();
        let err = init(dir.path(), PlanTier::Free).await.unwrap_err();
        assert_eq!(err.to_string(), "config error");
    }
}
