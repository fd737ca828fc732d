//! Command handlers for the attend CLI.
//!
//! Every handler returns an `Out` whose message is printed for the user and whose structure is
//! logged as JSON at debug level.

mod backup;
mod holidays;
mod init;
mod leave;
mod office;
mod profile;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use backup::{backup, BackupReport, Snapshot};
pub use holidays::{holidays, Holiday};
pub use init::init;
pub use leave::{leave_allowance, leave_book, leave_cancel, leave_show, BookedLeave, LeaveReport};
pub use office::{
    office_exclude, office_history, office_hold, office_include, office_settings, office_show,
    office_tap, render_month, DateChange, MonthReport, OfficeChanges,
};
pub use profile::{profile_set, profile_show};

/// The output type for a command: a message for the user and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    message: String,
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// `1 day`, `2 days`
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
