use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{PersistedPredictionRecord, PREDICTIONS_TABLE};

/// Insert-only access to a relational store, keyed by table name.
///
/// Rows are JSON objects whose keys are column names. Implementations must
/// be `Send + Sync + 'static` so a single store can be shared across
/// concurrent pipeline invocations and moved into detached write tasks.
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// Insert one row into `table`.
    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), StorageError>;

    /// Archive a prediction into [`PREDICTIONS_TABLE`].
    async fn insert_prediction(
        &self,
        record: &PersistedPredictionRecord,
    ) -> Result<(), StorageError> {
        self.insert(PREDICTIONS_TABLE, record.to_row()?).await
    }
}

/// Read-back for backends that can enumerate what they stored.
///
/// Not part of the prediction pipeline; used by the conformance suite and
/// the `history` command.
#[async_trait]
pub trait TableReader: Send + Sync {
    /// All rows of `table` in insertion order. Unknown tables are empty.
    async fn rows(&self, table: &str) -> Result<Vec<serde_json::Value>, StorageError>;
}
