//! Error types shared by the library and the `attend` binary.
//!
//! Internally everything is an `anyhow::Error`. Command handlers tag the errors they return with an
//! `ErrorType` so that the message a user finally sees names the area that failed.

use serde::{Deserialize, Serialize};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad area in which a user-facing error occurred.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory, `config.json` or some other local file.
    Config,
    /// Reading or writing documents in the store.
    Database,
    /// The arguments of a request were invalid, e.g. a date range that ends before it starts.
    Request,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// Extension for converting an internal result into one that is returned from a public command.
pub trait IntoResult<T> {
    /// Wraps the error, if any, with the given `ErrorType` as its outermost context.
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Result<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.context(format!("{error_type} error")))
    }
}
