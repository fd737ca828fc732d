//! The document store that user records are persisted to.
//!
//! Documents are JSON objects addressed by `(collection, id)`. The store knows nothing about the
//! shape of the records; the typed helpers in `Records` convert between documents and the model.

mod memory;
mod records;

use crate::calendar::YearMonth;
use crate::model::UserId;
use crate::Result;
use anyhow::{bail, ensure};
use serde_json::Value;

pub use memory::MemoryStore;
pub use records::Records;

/// Profiles, keyed by `{userId}`.
pub const USERS: &str = "users";

/// Leave records, keyed by `{userId}`.
pub const LEAVE: &str = "leave";

/// Office tracker records, keyed by `{userId}_{YYYY-MM}`.
pub const OFFICE_TRACKER: &str = "office_tracker";

/// Read and write access to documents.
///
/// Every write is a single-document overwrite; the last write wins.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the document, or `None` if there is no document at `(collection, id)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Writes the document. When `merge` is true, the top-level fields of `value` replace those of
    /// any existing document and its other fields are kept. When `merge` is false the document is
    /// replaced. Documents containing `null` anywhere are rejected.
    async fn set(&self, collection: &str, id: &str, value: Value, merge: bool) -> Result<()>;

    /// All documents in `collection` whose id starts with `id_prefix`, ordered by id.
    async fn list(&self, collection: &str, id_prefix: &str) -> Result<Vec<(String, Value)>>;
}

/// The id of the office tracker document for `user` and `month`.
pub fn office_tracker_id(user: &UserId, month: YearMonth) -> String {
    format!("{user}_{month}")
}

/// The id of the leave document for `user`.
pub fn leave_id(user: &UserId) -> String {
    user.to_string()
}

/// The id of the profile document for `user`.
pub fn profile_id(user: &UserId) -> String {
    user.to_string()
}

/// Checks that `value` is an object that contains no `null` at any depth.
pub fn validate_document(value: &Value) -> Result<()> {
    ensure!(value.is_object(), "A document must be a JSON object");
    check_no_nulls(value, "$")
}

fn check_no_nulls(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Null => bail!("The document has an undefined value at {path}"),
        Value::Array(items) => {
            for (ix, item) in items.iter().enumerate() {
                check_no_nulls(item, &format!("{path}[{ix}]"))?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                check_no_nulls(field, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Applies `patch` on top of `existing`, one level deep.
pub(crate) fn merge_documents(existing: Option<Value>, patch: Value) -> Value {
    match (existing, patch) {
        (Some(Value::Object(mut base)), Value::Object(fields)) => {
            for (key, field) in fields {
                base.insert(key, field);
            }
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}
