//! Local backup files of user records and of the database.

use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

/// Prefix for JSON snapshots of a user's records. The user id is appended, e.g. `snapshot-u1`.
pub const SNAPSHOT: &str = "snapshot";

/// Prefix for SQLite backup files.
pub const SQLITE: &str = "attend.sqlite";

/// Creates backup files and rotates old ones.
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

    /// Writes `data` as pretty-printed JSON to `{prefix}.YYYY-MM-DD-NNN.json`, where NNN is the
    /// next free sequence number for today, then deletes the oldest files with the same prefix
    /// beyond `backup_copies`.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json<T>(&self, prefix: &str, data: &T) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date, "json").await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}.json"));

        let json = serde_json::to_string_pretty(data)
            .with_context(|| format!("Failed to serialize the {prefix} backup"))?;
        utils::write(&path, json).await?;

        self.rotate(prefix, "json").await?;
        Ok(path)
    }

    /// Copies the SQLite database file to `attend.sqlite.YYYY-MM-DD-NNN` and rotates.
    pub async fn copy_sqlite(&self) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(SQLITE, &date, "").await?;
        let path = self.backups_dir.join(format!("{SQLITE}.{date}-{seq:03}"));

        utils::copy(&self.sqlite_path, &path).await?;

        self.rotate(SQLITE, "").await?;
        Ok(path)
    }

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

    /// Keeps only the newest `backup_copies` files with the given prefix.
    async fn rotate(&self, prefix: &str, extension: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, String)> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|(_, name)| is_backup_file(name, prefix, extension))
            .collect();

        // Names sort by date then sequence number.
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

/// Splits `{prefix}.YYYY-MM-DD-NNN.{extension}` (or `{prefix}.YYYY-MM-DD-NNN` when `extension` is
/// empty) into its date and sequence number. Any other name is `None`.
fn backup_stamp<'a>(filename: &'a str, prefix: &str, extension: &str) -> Option<(&'a str, u32)> {
    let rest = filename.strip_prefix(prefix)?.strip_prefix('.')?;
    let stamp = if extension.is_empty() {
        rest
    } else {
        rest.strip_suffix(extension)?.strip_suffix('.')?
    };
    let (date, seq) = stamp.rsplit_once('-')?;
    let dated = date.len() == 10
        && date.bytes().enumerate().all(|(ix, b)| match ix {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !dated || seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((date, seq.parse().ok()?))
}

/// The NNN of a backup named for `prefix` and `date`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str, extension: &str) -> Option<u32> {
    backup_stamp(filename, prefix, extension)
        .filter(|(d, _)| *d == date)
        .map(|(_, seq)| seq)
}

fn is_backup_file(filename: &str, prefix: &str, extension: &str) -> bool {
    backup_stamp(filename, prefix, extension).is_some()
}
