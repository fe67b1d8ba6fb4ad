//! Conformance test suite for table store backends.
//!
//! Any backend implementing both [`TableStore`] and [`TableReader`] can run
//! this suite to verify it. The suite covers:
//!
//! - **Insert**: rows are readable, ordered, and isolated per table
//! - **Records**: prediction records land in the predictions table intact
//! - **Concurrency**: parallel inserts from many tasks are all retained
//!
//! # Usage
//!
//! ```ignore
//! use arena_pulse_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { InMemoryStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod insert;

use std::fmt;
use std::future::Future;

use crate::record::{PersistedPredictionRecord, SYSTEM_CREATOR};
use crate::{TableReader, TableStore};

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "insert", "concurrent").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(insert::run_insert_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

fn make_record(prediction_type: &str, accuracy: f64) -> PersistedPredictionRecord {
    PersistedPredictionRecord {
        prediction_type: prediction_type.to_string(),
        query: serde_json::json!({
            "eventType": "football match",
            "attendanceEstimate": 65000,
            "timeWindowMinutes": 30,
            "predictionKind": prediction_type,
        }),
        result: serde_json::json!({
            "id": "conformance-1",
            "title": "Gate Surge Expected",
            "accuracyPercent": accuracy,
            "recommendations": ["Open Gate C"],
        }),
        model: "conformance-model".to_string(),
        confidence_score: accuracy / 100.0,
        created_by: SYSTEM_CREATOR.to_string(),
    }
}
