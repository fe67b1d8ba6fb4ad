//! Pipeline configuration, passed explicitly at construction time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default model identifier sent to the generation service.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Sampling temperature for every prediction. Fixed, not configurable.
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Default bound on a single generation call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default completion budget.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// How the best-effort persistence write relates to the caller's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Await the write before returning; its outcome never alters the result.
    #[default]
    Await,
    /// Spawn the write and return immediately; failures are logged by the task.
    Detached,
}

/// Settings for a [`PredictionPipeline`](crate::PredictionPipeline).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Model identifier, recorded with every persisted prediction.
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on the generation call; expiry routes to the fallback.
    pub request_timeout: Duration,
    /// Creator tag written with persisted predictions.
    pub created_by: String,
    pub persist_mode: PersistMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            created_by: arena_pulse_storage::SYSTEM_CREATOR.to_string(),
            persist_mode: PersistMode::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_persist_mode(mut self, mode: PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }
}
