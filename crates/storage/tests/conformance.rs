//! Runs the storage conformance suite against the bundled backends.

use std::sync::atomic::{AtomicUsize, Ordering};

use arena_pulse_storage::conformance::run_conformance_suite;
use arena_pulse_storage::{InMemoryStore, JsonlStore};

#[tokio::test]
async fn in_memory_store_conformance() {
    let report = run_conformance_suite(|| async { InMemoryStore::new() }).await;
    assert!(report.total > 0);
    assert!(report.failed == 0, "{report}");
}

#[tokio::test]
async fn jsonl_store_conformance() {
    let root = tempfile::tempdir().unwrap();
    let counter = AtomicUsize::new(0);
    let report = run_conformance_suite(|| {
        let dir = root
            .path()
            .join(format!("store-{}", counter.fetch_add(1, Ordering::SeqCst)));
        async move { JsonlStore::open(dir).await.expect("open jsonl store") }
    })
    .await;
    assert!(report.failed == 0, "{report}");
}
