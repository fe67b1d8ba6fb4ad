//! Process-local table store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{StorageError, TableReader, TableStore};

/// Keeps rows in memory, grouped by table. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<serde_json::Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, |rows| rows.len())
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }
}

#[async_trait]
impl TableReader for InMemoryStore {
    async fn rows(&self, table: &str) -> Result<Vec<serde_json::Value>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default())
    }
}

/// Accepts and discards every row. Used when persistence is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl TableStore for NullStore {
    async fn insert(&self, _table: &str, _row: serde_json::Value) -> Result<(), StorageError> {
        Ok(())
    }
}
