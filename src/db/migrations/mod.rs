//! Versioned schema migrations for the receipts database.
//!
//! Each schema version `NN` has a pair of SQL files in this directory:
//! - `migration_NN_up.sql` takes the schema from `NN-1` to `NN`
//! - `migration_NN_down.sql` takes the schema from `NN` back to `NN-1`
//!
//! The current version lives in a single-row `schema_version` table.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

/// The schema version this build expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    /// The version reached by running `up_sql`.
    version: i32,
    up_sql: &'static str,
    /// Returns the schema to `version - 1`.
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Creates the `schema_version` table in a brand-new database and records version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to insert initial schema version")?;
    Ok(())
}

/// Reads the schema version recorded in the database.
pub(crate) async fn version(pool: &SqlitePool) -> Result<i32> {
    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read schema_version")?;
    row.0.context("The schema_version table is empty")
}

/// Moves the schema from `current_ver` to `target_ver`, one version at a time, in either
/// direction. Every required migration is checked for before any of them runs, and each one
/// commits together with its `schema_version` update.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Result<()> {
    if current_ver == target_ver {
        debug!("Schema is at version {target_ver}, nothing to migrate");
        return Ok(());
    }
    validate_migrations(current_ver, target_ver)?;

    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            debug!("Migrating schema up to version {version:02}");
            run_single_migration(pool, find(version)?.up_sql, version).await?;
        }
    } else {
        for version in (target_ver + 1..=current_ver).rev() {
            debug!("Migrating schema down from version {version:02}");
            run_single_migration(pool, find(version)?.down_sql, version - 1).await?;
        }
    }

    debug!("Schema migrated from version {current_ver} to {target_ver}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    // The SQL files hold several statements each.
    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}

fn validate_migrations(current_version: i32, target_version: i32) -> Result<()> {
    let (start, end) = if current_version < target_version {
        (current_version + 1, target_version)
    } else {
        (target_version + 1, current_version)
    };

    if let Some(missing) = (start..=end).find(|v| !MIGRATIONS.iter().any(|m| m.version == *v)) {
        bail!(
            "Migration {missing} is missing but required to migrate from version \
            {current_version} to {target_version}"
        );
    }
    Ok(())
}
