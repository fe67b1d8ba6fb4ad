//! `arena-pulse serve` -- HTTP JSON API for the prediction pipeline.
//!
//! Endpoints:
//! - GET  /health       - Server status
//! - POST /predictions  - Generate a prediction for a request body
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod state;

use std::sync::Arc;

use arena_pulse_predict::PredictionPipeline;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use self::handlers::{handle_health, handle_not_found, handle_predict};
use self::state::AppState;

/// Maximum request body size: 64 KB.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn router(pipeline: Arc<PredictionPipeline>) -> Result<Router, String> {
    let state = Arc::new(AppState {
        pipeline,
        request_validator: crate::request::request_validator()?,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/predictions", post(handle_predict))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state))
}

/// Serve `pipeline` on `0.0.0.0:<port>` until Ctrl+C, then wait for
/// detached prediction writes before returning.
pub(crate) async fn start_server(
    port: u16,
    pipeline: PredictionPipeline,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(pipeline);
    let model = pipeline.config().model.clone();
    let app = router(Arc::clone(&pipeline))?;

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, model = %model, "Arena Pulse listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pipeline.flush().await;
    info!("Server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
