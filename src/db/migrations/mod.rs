//! Schema migrations for the document database.
//!
//! Each version `NN` has a pair of files in this directory: `migration_NN_up.sql` takes the schema
//! from `NN-1` to `NN` and `migration_NN_down.sql` reverses it.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::{debug, info};

use crate::Result;

struct Migration {
    version: i32,
    up: &'static str,
    down: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        up: include_str!("migration_01_up.sql"),
        down: include_str!("migration_01_down.sql"),
    },
    Migration {
        version: 2,
        up: include_str!("migration_02_up.sql"),
        down: include_str!("migration_02_down.sql"),
    },
];

/// The newest schema version this build knows about.
pub(crate) const LATEST: i32 = 2;

/// Moves the schema from version `from` to version `to`, one migration at a time.
///
/// Every step runs in its own transaction together with the `schema_version` update, so a failed
/// step leaves the database at the last version that completed.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Schema is at version {to}, nothing to migrate");
        return Ok(());
    }
    check_available(from, to)?;

    if from < to {
        for version in (from + 1)..=to {
            debug!("Applying migration {version:02}");
            step(pool, find(version)?.up, version).await?;
        }
    } else {
        for version in ((to + 1)..=from).rev() {
            debug!("Reverting migration {version:02}");
            step(pool, find(version)?.down, version - 1).await?;
        }
    }

    info!("Database schema migrated from version {from} to {to}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn step(pool: &SqlitePool, sql: &str, resulting_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

/// Fails before anything runs if any migration between `from` and `to` is missing.
fn check_available(from: i32, to: i32) -> Result<()> {
    let (low, high) = if from < to {
        (from + 1, to)
    } else {
        (to + 1, from)
    };
    for version in low..=high {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is missing, cannot migrate from version {from} to {to}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    async fn empty_db() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("migrate.sqlite"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .unwrap();
        (dir, pool)
    }

    async fn version(pool: &SqlitePool) -> i32 {
        let row: (i32,) = sqlx::query_as("SELECT version FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    async fn exists(pool: &SqlitePool, kind: &str, name: &str) -> bool {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = ? AND name = ?")
                .bind(kind)
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        row.0 > 0
    }

    #[tokio::test]
    async fn test_up_to_latest() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, LATEST).await.unwrap();
        assert_eq!(version(&pool).await, LATEST);
        assert!(exists(&pool, "table", "documents").await);
        assert!(exists(&pool, "index", "documents_by_updated_at").await);
    }

    #[tokio::test]
    async fn test_down_one_step_then_to_zero() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, LATEST).await.unwrap();

        run(&pool, LATEST, 1).await.unwrap();
        assert_eq!(version(&pool).await, 1);
        assert!(exists(&pool, "table", "documents").await);
        assert!(!exists(&pool, "index", "documents_by_updated_at").await);

        run(&pool, 1, 0).await.unwrap();
        assert_eq!(version(&pool).await, 0);
        assert!(!exists(&pool, "table", "documents").await);
    }

    #[tokio::test]
    async fn test_same_version_is_a_no_op() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(version(&pool).await, 1);
    }

    #[test]
    fn test_check_available() {
        assert!(check_available(0, LATEST).is_ok());
        assert!(check_available(LATEST, 0).is_ok());
        assert!(check_available(0, LATEST + 1).is_err());
        assert!(check_available(LATEST + 2, 1).is_err());
    }
}
