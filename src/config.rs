//! Configuration file handling for attend.
//!
//! The configuration file is stored at `$ATTEND_HOME/config.json`. It names the user that commands
//! act for by default and holds the defaults used for months and leave records that have not been
//! saved yet.

use crate::backup::Backup;
use crate::calendar::ComplianceRules;
use crate::db::Db;
use crate::model::UserId;
use crate::store::{DocumentStore, Records};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "attend";
const CONFIG_VERSION: u8 = 1;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const ATTEND_SQLITE: &str = "attend.sqlite";

const DEFAULT_REQUIRED_PERCENTAGE: u8 = 60;
const DEFAULT_LEAVE_ALLOWANCE: u32 = 25;
const BACKUP_COPIES: u32 = 5;

/// The `Config` object represents an attend home directory. You instantiate it by providing the
/// path to `$ATTEND_HOME` and from there it loads `config.json` and opens the database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    sqlite_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
}

impl Config {
    /// Creates the home directory and its subdirectories, writes an initial `config.json` for
    /// `user_id` with default settings and initializes the database.
    ///
    /// # Errors
    /// - Returns an error if `config.json` already exists or if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, user_id: UserId) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the attend home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "attend is already initialized, found '{}'",
                config_path.display()
            );
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_file = ConfigFile::new(user_id);
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(ATTEND_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            sqlite_path,
            config_file,
            db,
        })
    }

    /// This will
    /// - validate that `attend_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups directory exists
    /// - open the database, migrating it if needed
    pub async fn load(attend_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = attend_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The attend home directory is missing, run 'attend init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let sqlite_path = root.join(ATTEND_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            sqlite_path,
            config_file,
            db,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// The document store that records are read from and written to.
    pub fn store(&self) -> &dyn DocumentStore {
        &self.db
    }

    /// The user named in `config.json`.
    pub fn user_id(&self) -> &UserId {
        &self.config_file.user_id
    }

    /// Returns `user` if one was given on the command line, otherwise the configured user.
    pub fn resolve_user(&self, user: Option<&UserId>) -> UserId {
        user.unwrap_or(&self.config_file.user_id).clone()
    }

    /// Typed access to the documents of `user`.
    pub fn records<'a>(&'a self, user: &'a UserId) -> Records<'a> {
        Records::new(self.store(), user)
    }

    /// Settings for a month that has no office tracker record yet.
    pub fn office_defaults(&self) -> ComplianceRules {
        ComplianceRules {
            required_percentage: self.config_file.default_required_percentage,
            exclude_weekends: self.config_file.default_exclude_weekends,
            exclude_bank_holidays: self.config_file.default_exclude_bank_holidays,
        }
    }

    /// Available days for a user who has no leave record yet.
    pub fn leave_allowance(&self) -> u32 {
        self.config_file.default_leave_allowance
    }

    /// Whether booked leave is taken out of the working-day pool of the office tracker.
    pub fn leave_overlay(&self) -> bool {
        self.config_file.leave_overlay
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
///   "app_name": "attend",
///   "config_version": 1,
///   "user_id": "9f3c2a71",
///   "default_required_percentage": 60,
///   "default_exclude_weekends": true,
///   "default_exclude_bank_holidays": true,
///   "default_leave_allowance": 25,
///   "leave_overlay": true,
///   "backup_copies": 5
/// }
/// ```
///
/// Only `app_name`, `config_version` and `user_id` are required.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Should always be "attend"
    app_name: String,

    config_version: u8,

    /// The user that commands act for when `--user` is not given
    user_id: UserId,

    #[serde(default = "default_required_percentage")]
    default_required_percentage: u8,

    #[serde(default = "yes")]
    default_exclude_weekends: bool,

    #[serde(default = "yes")]
    default_exclude_bank_holidays: bool,

    #[serde(default = "default_leave_allowance")]
    default_leave_allowance: u32,

    /// Booked leave is removed from the office tracker's working-day pool
    #[serde(default = "yes")]
    leave_overlay: bool,

    #[serde(default = "backup_copies")]
    backup_copies: u32,
}

fn default_required_percentage() -> u8 {
    DEFAULT_REQUIRED_PERCENTAGE
}

fn default_leave_allowance() -> u32 {
    DEFAULT_LEAVE_ALLOWANCE
}

fn backup_copies() -> u32 {
    BACKUP_COPIES
}

fn yes() -> bool {
    true
}

impl ConfigFile {
    fn new(user_id: UserId) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            user_id,
            default_required_percentage: DEFAULT_REQUIRED_PERCENTAGE,
            default_exclude_weekends: true,
            default_exclude_bank_holidays: true,
            default_leave_allowance: DEFAULT_LEAVE_ALLOWANCE,
            leave_overlay: true,
            backup_copies: BACKUP_COPIES,
        }
    }

    /// Loads and validates the config file at `path`.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.config_version <= CONFIG_VERSION,
            "The config file version {} is newer than this build supports ({CONFIG_VERSION})",
            config.config_version
        );
        ensure!(
            config.default_required_percentage <= 100,
            "default_required_percentage must be between 0 and 100, got {}",
            config.default_required_percentage
        );
        ensure!(
            config.backup_copies > 0,
            "backup_copies must be at least 1"
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
