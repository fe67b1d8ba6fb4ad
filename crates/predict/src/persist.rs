//! Best-effort archival of successful predictions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arena_pulse_core::{PredictionRequest, PredictionResult};
use arena_pulse_storage::{PersistedPredictionRecord, TableStore};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::PersistMode;

/// What happened to the persistence write for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistAttempt {
    /// The store accepted the row.
    Stored,
    /// The write failed; the reason was logged.
    Failed(String),
    /// The write was handed to a background task.
    Detached,
    /// No write was attempted (fallback path).
    Skipped,
}

/// Assemble the archive row for a successful prediction.
pub fn build_record(
    request: &PredictionRequest,
    result: &PredictionResult,
    model: &str,
    created_by: &str,
) -> Result<PersistedPredictionRecord, serde_json::Error> {
    Ok(PersistedPredictionRecord {
        prediction_type: request.prediction_kind.clone(),
        query: serde_json::to_value(request)?,
        result: serde_json::to_value(result)?,
        model: model.to_string(),
        confidence_score: result.confidence_score(),
        created_by: created_by.to_string(),
    })
}

/// Count of detached writes that have not finished yet.
#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingWrites {
    pub(crate) fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn begin(self: &Arc<Self>) -> PendingGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingGuard(Arc::clone(self))
    }

    /// Resolve once no detached write is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.len() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Held by a detached write task; released on completion or cancellation.
struct PendingGuard(Arc<PendingWrites>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Write `record` according to `mode`. Never fails; the outcome is reported.
pub(crate) async fn persist(
    store: &Arc<dyn TableStore>,
    pending: &Arc<PendingWrites>,
    record: PersistedPredictionRecord,
    mode: PersistMode,
    prediction_id: &str,
) -> PersistAttempt {
    match (mode, tokio::runtime::Handle::try_current()) {
        (PersistMode::Detached, Ok(handle)) => {
            let store = Arc::clone(store);
            let prediction_id = prediction_id.to_string();
            let guard = pending.begin();
            handle.spawn(async move {
                let _guard = guard;
                match store.insert_prediction(&record).await {
                    Ok(()) => debug!(prediction_id = %prediction_id, "Prediction persisted"),
                    Err(e) => warn!(
                        prediction_id = %prediction_id,
                        error = %e,
                        "Detached prediction write failed"
                    ),
                }
            });
            PersistAttempt::Detached
        }
        _ => match store.insert_prediction(&record).await {
            Ok(()) => {
                debug!(prediction_id = %prediction_id, "Prediction persisted");
                PersistAttempt::Stored
            }
            Err(e) => {
                warn!(
                    prediction_id = %prediction_id,
                    error = %e,
                    "Prediction write failed; returning result unchanged"
                );
                PersistAttempt::Failed(e.to_string())
            }
        },
    }
}
