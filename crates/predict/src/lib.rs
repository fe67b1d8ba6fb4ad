//! arena-pulse-predict: the AI prediction pipeline.
//!
//! [`PredictionPipeline::assemble`] renders a prompt, calls the generation
//! service through an [`LlmClient`], normalizes the reply, and returns a
//! [`PredictionResult`](arena_pulse_core::PredictionResult). It never fails:
//! every upstream problem yields the fallback record, and the best-effort
//! write to the [`TableStore`](arena_pulse_storage::TableStore) never
//! changes what the caller receives.

pub mod config;
pub mod fallback;
pub mod ids;
pub mod llm;
pub mod persist;
pub mod pipeline;

pub use config::{
    PersistMode, PipelineConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
    GENERATION_TEMPERATURE,
};
pub use fallback::{fallback_result, FallbackReason, FALLBACK_DESCRIPTION};
pub use ids::{IdGenerator, UuidGenerator};
pub use llm::{CompletionRequest, LlmClient, LlmError, Message, UnavailableClient};
#[cfg(feature = "anthropic")]
pub use llm::{AnthropicClient, AnthropicConfig};
pub use persist::PersistAttempt;
pub use pipeline::{PipelineOutcome, PredictionPipeline};
