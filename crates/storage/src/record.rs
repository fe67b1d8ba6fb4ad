use serde::{Deserialize, Serialize};

/// Table that archives generated predictions.
pub const PREDICTIONS_TABLE: &str = "ai_predictions";

/// Creator tag written with every system-generated prediction.
pub const SYSTEM_CREATOR: &str = "system";

/// One archived prediction row.
///
/// `query` and `result` hold the serialized request and result so the
/// storage crate stays independent of the prediction model types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPredictionRecord {
    pub prediction_type: String,
    pub query: serde_json::Value,
    pub result: serde_json::Value,
    pub model: String,
    /// Accuracy divided by 100, in `[0, 1]`.
    pub confidence_score: f64,
    pub created_by: String,
}

impl PersistedPredictionRecord {
    /// The row as inserted into [`PREDICTIONS_TABLE`].
    pub fn to_row(&self) -> Result<serde_json::Value, crate::StorageError> {
        serde_json::to_value(self).map_err(|e| crate::StorageError::Serialization {
            table: PREDICTIONS_TABLE.to_string(),
            message: e.to_string(),
        })
    }
}
