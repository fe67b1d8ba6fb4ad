//! PostgREST-compatible table store (Supabase and similar hosted backends).
//!
//! Rows are inserted with `POST {base_url}/rest/v1/{table}`. Uses `ureq`
//! (sync) wrapped in `tokio::task::spawn_blocking` to avoid blocking the
//! async runtime.

use std::time::Duration;

use async_trait::async_trait;

use crate::{StorageError, TableStore};

/// Default per-insert timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for a [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// Service or anon key sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl RestStoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }
}

/// Table store that inserts over HTTP.
#[derive(Debug, Clone)]
pub struct RestStore {
    config: RestStoreConfig,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TableStore for RestStore {
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), StorageError> {
        let url = self.config.table_url(table);
        let api_key = self.config.api_key.clone();
        let timeout = self.config.timeout;
        let table = table.to_string();

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            let mut request = agent
                .post(&url)
                .header("content-type", "application/json")
                .header("prefer", "return=minimal");
            if let Some(ref key) = api_key {
                request = request
                    .header("apikey", key)
                    .header("authorization", &format!("Bearer {}", key));
            }

            match request.send_json(&row) {
                Ok(_) => Ok(()),
                Err(ureq::Error::StatusCode(status)) => Err(StorageError::Rejected {
                    table,
                    status,
                    message: format!("HTTP status {}", status),
                }),
                Err(e) => Err(StorageError::Backend(format!("POST {} failed: {}", url, e))),
            }
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {}", e)))?
    }
}
