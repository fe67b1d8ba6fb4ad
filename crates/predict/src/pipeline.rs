//! Prediction assembler: prompt -> generation -> normalization -> result.
//!
//! The pipeline always produces a [`PredictionResult`]. Generation failures,
//! timeouts, and malformed responses all collapse to the fallback record;
//! persistence failures are logged and never touch the result.

use std::sync::Arc;
use std::time::Instant;

use arena_pulse_core::{normalize, prompt, NormalizedPredictionFields, PredictionRequest, PredictionResult};
use arena_pulse_storage::TableStore;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, GENERATION_TEMPERATURE};
use crate::fallback::{fallback_result, FallbackReason};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::persist::{build_record, persist, PendingWrites, PersistAttempt};

/// Everything one invocation produced, for telemetry and tests.
///
/// Callers that only need the record use [`PredictionPipeline::assemble`].
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: PredictionResult,
    /// Set when the fallback record was returned.
    pub fallback: Option<FallbackReason>,
    pub persisted: PersistAttempt,
}

impl PipelineOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// The prediction pipeline with its collaborators.
///
/// Holds only shared, immutable state, so one pipeline can serve many
/// concurrent invocations.
pub struct PredictionPipeline {
    client: Arc<dyn LlmClient>,
    store: Arc<dyn TableStore>,
    ids: Arc<dyn IdGenerator>,
    config: PipelineConfig,
    pending: Arc<PendingWrites>,
}

impl PredictionPipeline {
    /// Create a pipeline that issues UUID identifiers.
    pub fn new(
        client: Arc<dyn LlmClient>,
        store: Arc<dyn TableStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            store,
            ids: Arc::new(UuidGenerator),
            config,
            pending: Arc::new(PendingWrites::default()),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detached writes still in flight.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Wait until every detached write has landed or logged its failure.
    ///
    /// Call before the runtime shuts down; a runtime dropped with writes in
    /// flight cancels them.
    pub async fn flush(&self) {
        let pending = self.pending.len();
        if pending > 0 {
            info!(pending, "Waiting for detached prediction writes");
        }
        self.pending.wait_idle().await;
    }

    /// Produce a prediction for `request`. Never fails.
    pub async fn assemble(&self, request: &PredictionRequest) -> PredictionResult {
        self.run(request).await.result
    }

    /// Produce a prediction and report how it was obtained.
    pub async fn run(&self, request: &PredictionRequest) -> PipelineOutcome {
        let started = Instant::now();

        match self.generate_fields(request).await {
            Ok(fields) => {
                let result = PredictionResult::from_fields(self.ids.next_id(), fields, request);
                let persisted = self.persist(request, &result).await;
                info!(
                    prediction_id = %result.id,
                    kind = %request.prediction_kind,
                    model = %self.config.model,
                    accuracy = result.accuracy_percent,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Prediction generated"
                );
                PipelineOutcome {
                    result,
                    fallback: None,
                    persisted,
                }
            }
            Err(reason) => {
                let result = fallback_result(self.ids.next_id(), request);
                info!(
                    prediction_id = %result.id,
                    kind = %request.prediction_kind,
                    reason = reason.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Returning fallback prediction"
                );
                PipelineOutcome {
                    result,
                    fallback: Some(reason),
                    persisted: PersistAttempt::Skipped,
                }
            }
        }
    }

    /// Generating + Normalizing stages.
    async fn generate_fields(
        &self,
        request: &PredictionRequest,
    ) -> Result<NormalizedPredictionFields, FallbackReason> {
        let prompt = prompt::build(request);
        debug!(prompt_chars = prompt.len(), "Prompt built");

        let raw = self.generate(prompt).await.map_err(|e| {
            warn!(
                error = %e,
                request = %serde_json::to_string(request).unwrap_or_default(),
                "Generation service call failed"
            );
            FallbackReason::Generation(e)
        })?;

        normalize(&raw).map_err(|e| {
            warn!(
                reason = %e.reason,
                field = e.reason.field().unwrap_or("-"),
                snippet = %e.snippet,
                "Model response could not be normalized"
            );
            FallbackReason::Malformed(e)
        })
    }

    /// Call the generation service under the configured time bound.
    async fn generate(&self, prompt: String) -> Result<String, LlmError> {
        let completion = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: GENERATION_TEMPERATURE,
            max_tokens: self.config.max_tokens,
        };

        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.client.complete(completion)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(LlmError::EmptyResponse),
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }

    async fn persist(&self, request: &PredictionRequest, result: &PredictionResult) -> PersistAttempt {
        match build_record(request, result, &self.config.model, &self.config.created_by) {
            Ok(record) => {
                persist(
                    &self.store,
                    &self.pending,
                    record,
                    self.config.persist_mode,
                    &result.id,
                )
                .await
            }
            Err(e) => {
                warn!(prediction_id = %result.id, error = %e, "Could not serialize prediction record");
                PersistAttempt::Failed(e.to_string())
            }
        }
    }
}
