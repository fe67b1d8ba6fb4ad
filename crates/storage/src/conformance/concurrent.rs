use std::future::Future;
use std::sync::Arc;

use super::{make_record, TestResult};
use crate::record::PREDICTIONS_TABLE;
use crate::{TableReader, TableStore};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 16;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_inserts_all_retained",
            concurrent_inserts_all_retained(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_prediction_inserts_are_whole",
            concurrent_prediction_inserts_are_whole(factory).await,
        ),
    ]
}

/// N spawned tasks insert into the same table; every row must survive.
async fn concurrent_inserts_all_retained<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.insert("gates", serde_json::json!({"task": i})).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panicked: {}", e))?
            .map_err(|e| format!("insert failed: {}", e))?;
    }

    let rows = store.rows("gates").await.map_err(|e| e.to_string())?;
    let mut seen: Vec<u64> = rows.iter().filter_map(|r| r["task"].as_u64()).collect();
    seen.sort_unstable();
    let expected: Vec<u64> = (0..N as u64).collect();
    if seen != expected {
        return Err(format!("expected tasks 0..{}, got {:?}", N, seen));
    }
    Ok(())
}

/// Concurrent prediction inserts must each deserialize as a whole record.
async fn concurrent_prediction_inserts_are_whole<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let record = make_record(&format!("kind_{}", i), 80.0 + i as f64);
            store.insert_prediction(&record).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panicked: {}", e))?
            .map_err(|e| format!("insert failed: {}", e))?;
    }

    let rows = store
        .rows(PREDICTIONS_TABLE)
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != N {
        return Err(format!("expected {} rows, got {}", N, rows.len()));
    }
    for row in &rows {
        serde_json::from_value::<crate::PersistedPredictionRecord>(row.clone())
            .map_err(|e| format!("row is not a whole record: {}", e))?;
    }
    Ok(())
}
