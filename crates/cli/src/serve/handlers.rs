//! HTTP route handlers: health and predictions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::debug;

use super::json_error;
use super::state::AppState;
use crate::request::validate_request;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// POST /predictions
///
/// Answers 200 with a prediction record for every schema-valid body,
/// including when the fallback record was produced.
pub(crate) async fn handle_predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let parsed: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid JSON: {}", e))
                .into_response()
        }
    };

    let request = match validate_request(&state.request_validator, parsed) {
        Ok(r) => r,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("invalid request: {}", e))
                .into_response()
        }
    };

    let outcome = state.pipeline.run(&request).await;
    debug!(
        prediction_id = %outcome.result.id,
        fallback = outcome.is_fallback(),
        persisted = ?outcome.persisted,
        "Prediction served"
    );
    (StatusCode::OK, Json(outcome.result)).into_response()
}
