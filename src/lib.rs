//! attend: office attendance and leave tracking.
//!
//! The `calendar` module holds the compliance engine and does no I/O. Records are kept in a
//! `DocumentStore`, which is SQLite for the CLI, and the `commands` module ties the two together.

pub mod args;
mod backup;
pub mod calendar;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod store;
mod utils;

pub use backup::Backup;
pub use config::Config;
pub use error::{Error, ErrorType, IntoResult, Result};
