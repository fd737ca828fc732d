//! Implements the `DocumentStore` trait in memory.
//!
//! Note: this is compiled even in the "production" version of this crate so that the records and
//! commands can be driven without a SQLite file, e.g. by tests or by embedding callers.

use crate::store::{merge_documents, validate_document, DocumentStore};
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// An in-memory `DocumentStore`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of documents held, across all collections.
    pub async fn len(&self) -> usize {
        self.data.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let data = self.data.lock().await;
        Ok(data.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn set(&self, collection: &str, id: &str, value: Value, merge: bool) -> Result<()> {
        validate_document(&value)?;
        let key = (collection.to_string(), id.to_string());
        let mut data = self.data.lock().await;
        let value = if merge {
            merge_documents(data.remove(&key), value)
        } else {
            value
        };
        data.insert(key, value);
        Ok(())
    }

    async fn list(&self, collection: &str, id_prefix: &str) -> Result<Vec<(String, Value)>> {
        let data = self.data.lock().await;
        Ok(data
            .iter()
            .filter(|((c, id), _)| c == collection && id.starts_with(id_prefix))
            .map(|((_, id), value)| (id.clone(), value.clone()))
            .collect())
    }
}
