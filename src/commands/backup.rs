use crate::args::BackupArgs;
use crate::backup::SNAPSHOT;
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{LeaveRecord, OfficeTrackerRecord, UserId, UserProfile};
use crate::{Config, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Everything stored for one user.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub user_id: UserId,
    pub taken_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    pub leave: LeaveRecord,
    pub office: Vec<OfficeTrackerRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub snapshot: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<PathBuf>,
    pub office_months: usize,
    pub leave_entries: usize,
}

/// Writes a JSON snapshot of the records of `user` to the backups directory and, when asked,
/// copies the database file next to it. Old backups beyond `backup_copies` are removed.
pub async fn backup(config: Config, user: &UserId, args: &BackupArgs) -> Result<Out<BackupReport>> {
    let records = config.records(user);
    let snapshot = Snapshot {
        user_id: user.clone(),
        taken_at: Utc::now(),
        profile: records.profile().await.pub_result(ErrorType::Database)?,
        leave: records
            .leave(config.leave_allowance())
            .await
            .pub_result(ErrorType::Database)?,
        office: records
            .office_history()
            .await
            .pub_result(ErrorType::Database)?,
    };

    let backup = config.backup();
    let path = backup
        .save_json(&format!("{SNAPSHOT}-{user}"), &snapshot)
        .await
        .pub_result(ErrorType::Config)?;
    let sqlite = if args.sqlite() {
        Some(backup.copy_sqlite().await.pub_result(ErrorType::Config)?)
    } else {
        None
    };

    let report = BackupReport {
        snapshot: path,
        sqlite,
        office_months: snapshot.office.len(),
        leave_entries: snapshot.leave.entries().len(),
    };
    let mut message = format!(
        "Saved {} and {} to {}",
        plural(report.office_months, "month"),
        plural(report.leave_entries, "leave booking"),
        report.snapshot.display()
    );
    if let Some(sqlite) = &report.sqlite {
        message.push_str(&format!("\nCopied the database to {}", sqlite.display()));
    }
    Ok(Out::new(message, report))
}
