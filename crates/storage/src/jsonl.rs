//! JSON-lines table store: one append-only `<table>.jsonl` file per table.
//!
//! Each line is a [`JsonlEntry`] envelope carrying the insertion time and
//! the row itself.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{StorageError, TableReader, TableStore};

/// A stored line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonlEntry {
    /// RFC 3339 UTC timestamp of the insert.
    pub inserted_at: String,
    pub row: serde_json::Value,
}

/// Table store backed by a directory of JSON-lines files.
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
    /// Serializes appends so concurrent inserts never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> Result<PathBuf, StorageError> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(StorageError::Backend(format!(
                "invalid table name '{}': use letters, digits, and underscores",
                table
            )));
        }
        Ok(self.dir.join(format!("{}.jsonl", table)))
    }

    /// Every stored entry of `table`, oldest first.
    pub async fn entries(&self, table: &str) -> Result<Vec<JsonlEntry>, StorageError> {
        let path = self.table_path(table)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    StorageError::Backend(format!(
                        "{}: line {} is not a valid entry: {}",
                        path.display(),
                        i + 1,
                        e
                    ))
                })
            })
            .collect()
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[async_trait]
impl TableStore for JsonlStore {
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), StorageError> {
        let path = self.table_path(table)?;
        let entry = JsonlEntry {
            inserted_at: now_rfc3339(),
            row,
        };
        let mut line = serde_json::to_string(&entry).map_err(|e| StorageError::Serialization {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl TableReader for JsonlStore {
    async fn rows(&self, table: &str) -> Result<Vec<serde_json::Value>, StorageError> {
        Ok(self
            .entries(table)
            .await?
            .into_iter()
            .map(|entry| entry.row)
            .collect())
    }
}
