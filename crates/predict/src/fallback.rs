//! The fixed record returned whenever generation or normalization fails.

use arena_pulse_core::{
    IconKind, ImpactLevel, MalformedResponseError, PredictionRequest, PredictionResult, Trend,
    GENERATED_LABEL,
};

use crate::llm::LlmError;

/// Description carried by every fallback record. Callers can tell a fallback
/// from a generated prediction only by this text.
pub const FALLBACK_DESCRIPTION: &str =
    "Unable to generate detailed prediction at this time. Please check system connectivity and try again.";

pub const FALLBACK_ACCURACY: f64 = 85.0;

pub const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Monitor current conditions closely",
    "Follow standard operating procedures",
];

pub const FALLBACK_RISK_FACTORS: [&str; 2] =
    ["Limited prediction data available", "Generation service unavailable"];

/// Which stage sent the pipeline to the fallback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error("generation failed: {0}")]
    Generation(LlmError),

    #[error("{0}")]
    Malformed(MalformedResponseError),
}

impl FallbackReason {
    /// Short telemetry label: `"timeout"`, `"generation"`, or `"malformed"`.
    pub fn kind(&self) -> &'static str {
        match self {
            FallbackReason::Generation(LlmError::Timeout(_)) => "timeout",
            FallbackReason::Generation(_) => "generation",
            FallbackReason::Malformed(_) => "malformed",
        }
    }
}

/// Build the fallback record for `request` under a fresh `id`.
pub fn fallback_result(id: String, request: &PredictionRequest) -> PredictionResult {
    PredictionResult {
        id,
        title: format!("{} Prediction", request.prediction_kind),
        description: FALLBACK_DESCRIPTION.to_string(),
        impact_level: ImpactLevel::Medium,
        trend: Trend::Stable,
        icon_kind: IconKind::Event,
        accuracy_percent: FALLBACK_ACCURACY,
        display_time: request.display_time(),
        generated_label: GENERATED_LABEL.to_string(),
        recommendations: FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
        risk_factors: FALLBACK_RISK_FACTORS.iter().map(|s| s.to_string()).collect(),
    }
}
