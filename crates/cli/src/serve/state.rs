//! Application state shared across request handlers.

use std::sync::Arc;

use arena_pulse_predict::PredictionPipeline;

pub(crate) struct AppState {
    pub(crate) pipeline: Arc<PredictionPipeline>,
    /// Compiled `prediction-request.schema.json`.
    pub(crate) request_validator: jsonschema::Validator,
}
