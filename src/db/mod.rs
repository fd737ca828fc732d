//! This module is responsible for reading, writing and managing the SQLite database that documents
//! are persisted to.

mod migrations;

use crate::store::{merge_documents, validate_document, DocumentStore};
use crate::Result;
use anyhow::{bail, Context};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, trace};

/// A `DocumentStore` backed by a single SQLite file.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the schema to the latest version
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if exists(path).await? {
            bail!("A database already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;

        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create the schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to set the initial schema version")?;

        migrations::run(&pool, 0, migrations::LATEST).await?;
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Refuses to open a schema newer than this build understands
    /// - Migrates an older schema to the latest version
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !exists(path).await? {
            bail!(
                "There is no database at {}, run 'attend init' first",
                path.display()
            );
        }
        let db = Self {
            pool: connect(path, false).await?,
        };
        let version = db.schema_version().await?;
        if version > migrations::LATEST {
            bail!(
                "The database at {} has schema version {version}, this build supports up to {}",
                path.display(),
                migrations::LATEST
            );
        }
        migrations::run(&db.pool, version, migrations::LATEST).await?;
        Ok(db)
    }

    pub(crate) async fn schema_version(&self) -> Result<i32> {
        let row: (i32,) = sqlx::query_as("SELECT version FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read the schema version")?;
        Ok(row.0)
    }
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("Unable to check for a file at {}", path.display()))
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the SQLite database at {}", path.display()))
}

fn parse_body(collection: &str, id: &str, body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .with_context(|| format!("The stored document {collection}/{id} is not valid JSON"))
}

#[async_trait::async_trait]
impl DocumentStore for Db {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        trace!("SELECT {collection}/{id}");
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to read document {collection}/{id}"))?;
        row.map(|(body,)| parse_body(collection, id, &body))
            .transpose()
    }

    async fn set(&self, collection: &str, id: &str, value: Value, merge: bool) -> Result<()> {
        validate_document(&value)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin a transaction")?;

        let value = if merge {
            let existing: Option<(String,)> =
                sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to read document {collection}/{id}"))?;
            let existing = existing
                .map(|(body,)| parse_body(collection, id, &body))
                .transpose()?;
            merge_documents(existing, value)
        } else {
            value
        };
        let body = serde_json::to_string(&value)
            .with_context(|| format!("Unable to serialize document {collection}/{id}"))?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (collection, id) DO UPDATE SET \
             body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to write document {collection}/{id}"))?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit document {collection}/{id}"))
    }

    async fn list(&self, collection: &str, id_prefix: &str) -> Result<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, body FROM documents \
             WHERE collection = ? AND substr(id, 1, length(?)) = ? ORDER BY id",
        )
        .bind(collection)
        .bind(id_prefix)
        .bind(id_prefix)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list documents in {collection}"))?;

        rows.into_iter()
            .map(|(id, body)| {
                let value = parse_body(collection, &id, &body)?;
                Ok((id, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attend.sqlite");

        let db = Db::init(&path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::LATEST);
        db.set("leave", "u1", json!({"available_days": 20}), false)
            .await
            .unwrap();
        drop(db);

        let db = Db::load(&path).await.unwrap();
        assert_eq!(
            db.get("leave", "u1").await.unwrap(),
            Some(json!({"available_days": 20}))
        );
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attend.sqlite");
        Db::init(&path).await.unwrap();
        assert!(Db::init(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_load_requires_file() {
        let dir = TempDir::new().unwrap();
        let result = Db::load(dir.path().join("missing.sqlite")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_migrates_older_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attend.sqlite");
        let db = Db::init(&path).await.unwrap();
        migrations::run(&db.pool, migrations::LATEST, 1)
            .await
            .unwrap();
        assert_eq!(db.schema_version().await.unwrap(), 1);
        drop(db);

        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::LATEST);
    }

    #[tokio::test]
    async fn test_load_refuses_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attend.sqlite");
        let db = Db::init(&path).await.unwrap();
        sqlx::query("UPDATE schema_version SET version = ?")
            .bind(migrations::LATEST + 1)
            .execute(&db.pool)
            .await
            .unwrap();
        drop(db);
        assert!(Db::load(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_set_merge_and_replace() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("attend.sqlite")).await.unwrap();

        db.set("users", "u1", json!({"user_id": "u1", "email": "a@b.c"}), true)
            .await
            .unwrap();
        db.set("users", "u1", json!({"display_name": "Sam"}), true)
            .await
            .unwrap();
        assert_eq!(
            db.get("users", "u1").await.unwrap(),
            Some(json!({"user_id": "u1", "email": "a@b.c", "display_name": "Sam"}))
        );

        db.set("users", "u1", json!({"user_id": "u1"}), false)
            .await
            .unwrap();
        assert_eq!(
            db.get("users", "u1").await.unwrap(),
            Some(json!({"user_id": "u1"}))
        );
    }

    #[tokio::test]
    async fn test_set_rejects_nulls() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("attend.sqlite")).await.unwrap();
        let result = db.set("users", "u1", json!({"email": null}), false).await;
        assert!(result.is_err());
        assert!(db.get("users", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("attend.sqlite")).await.unwrap();
        for id in ["u1_2026-02", "u1_2026-01", "u10_2026-01", "u2_2026-01"] {
            db.set("office_tracker", id, json!({"id": id}), false)
                .await
                .unwrap();
        }
        let listed = db.list("office_tracker", "u1_").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["u1_2026-01", "u1_2026-02"]);
        assert_eq!(listed[0].1, json!({"id": "u1_2026-01"}));
    }
}
