//! arena-pulse-core: prediction data model, prompt builder, and response
//! normalizer for the Arena Pulse stadium-operations dashboard.
//!
//! Everything in this crate is pure and synchronous. The async pipeline that
//! talks to the generation service and the data store lives in
//! `arena-pulse-predict`.
//!
//! - [`prompt::build`] -- render a [`PredictionRequest`] into model instructions
//! - [`normalize::normalize`] -- coerce model text into [`NormalizedPredictionFields`]
//! - [`PredictionResult`] -- the record callers see and the store archives

pub mod normalize;
pub mod prompt;
pub mod types;

pub use normalize::{normalize, MalformedReason, MalformedResponseError};
pub use prompt::build as build_prompt;
pub use types::{
    IconKind, ImpactLevel, NormalizedPredictionFields, PredictionRequest, PredictionResult, Trend,
    GENERATED_LABEL,
};
