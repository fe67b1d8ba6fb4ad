use std::future::Future;

use super::{make_record, TestResult};
use crate::record::PREDICTIONS_TABLE;
use crate::{PersistedPredictionRecord, TableReader, TableStore};

pub(super) async fn run_insert_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "insert",
            "inserted_row_is_readable",
            inserted_row_is_readable(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "rows_keep_insertion_order",
            rows_keep_insertion_order(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "tables_are_independent",
            tables_are_independent(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "unknown_table_is_empty",
            unknown_table_is_empty(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "nested_values_survive",
            nested_values_survive(factory).await,
        ),
        TestResult::from_result(
            "records",
            "prediction_record_lands_in_predictions_table",
            prediction_record_lands_in_predictions_table(factory).await,
        ),
        TestResult::from_result(
            "records",
            "prediction_record_round_trips",
            prediction_record_round_trips(factory).await,
        ),
    ]
}

async fn inserted_row_is_readable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let row = serde_json::json!({"gate": "A", "open": true});
    store
        .insert("gates", row.clone())
        .await
        .map_err(|e| format!("insert failed: {}", e))?;
    let rows = store
        .rows("gates")
        .await
        .map_err(|e| format!("rows failed: {}", e))?;
    if rows != vec![row] {
        return Err(format!("expected exactly the inserted row, got {:?}", rows));
    }
    Ok(())
}

async fn rows_keep_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for n in 0..5 {
        store
            .insert("ordered", serde_json::json!({"n": n}))
            .await
            .map_err(|e| format!("insert {} failed: {}", n, e))?;
    }
    let rows = store.rows("ordered").await.map_err(|e| e.to_string())?;
    let seen: Vec<i64> = rows.iter().filter_map(|r| r["n"].as_i64()).collect();
    if seen != vec![0, 1, 2, 3, 4] {
        return Err(format!("expected rows 0..5 in order, got {:?}", seen));
    }
    Ok(())
}

async fn tables_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert("parking", serde_json::json!({"lot": "N1"}))
        .await
        .map_err(|e| e.to_string())?;
    store
        .insert("staffing", serde_json::json!({"team": "stewards"}))
        .await
        .map_err(|e| e.to_string())?;
    let parking = store.rows("parking").await.map_err(|e| e.to_string())?;
    let staffing = store.rows("staffing").await.map_err(|e| e.to_string())?;
    if parking.len() != 1 || staffing.len() != 1 {
        return Err(format!(
            "expected one row per table, got parking={} staffing={}",
            parking.len(),
            staffing.len()
        ));
    }
    Ok(())
}

async fn unknown_table_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let rows = store.rows("never_written").await.map_err(|e| e.to_string())?;
    if !rows.is_empty() {
        return Err(format!("expected no rows, got {}", rows.len()));
    }
    Ok(())
}

async fn nested_values_survive<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let row = serde_json::json!({
        "query": {"weatherCondition": "rain, 12°C", "tags": ["derby", null, 3]},
        "score": 0.915,
        "note": "line one\nline two",
    });
    store
        .insert("nested", row.clone())
        .await
        .map_err(|e| e.to_string())?;
    let rows = store.rows("nested").await.map_err(|e| e.to_string())?;
    if rows.first() != Some(&row) {
        return Err(format!("nested row changed on the way through: {:?}", rows));
    }
    Ok(())
}

async fn prediction_record_lands_in_predictions_table<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert_prediction(&make_record("crowd_flow", 91.0))
        .await
        .map_err(|e| format!("insert_prediction failed: {}", e))?;
    let rows = store
        .rows(PREDICTIONS_TABLE)
        .await
        .map_err(|e| e.to_string())?;
    let row = rows
        .first()
        .ok_or_else(|| format!("no row in {}", PREDICTIONS_TABLE))?;
    for column in [
        "prediction_type",
        "query",
        "result",
        "model",
        "confidence_score",
        "created_by",
    ] {
        if row.get(column).is_none() {
            return Err(format!("row is missing column '{}'", column));
        }
    }
    if row["created_by"] != "system" {
        return Err(format!("created_by should be 'system', got {}", row["created_by"]));
    }
    Ok(())
}

async fn prediction_record_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TableStore + TableReader,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let record = make_record("parking", 87.0);
    store
        .insert_prediction(&record)
        .await
        .map_err(|e| e.to_string())?;
    let rows = store
        .rows(PREDICTIONS_TABLE)
        .await
        .map_err(|e| e.to_string())?;
    let row = rows
        .first()
        .cloned()
        .ok_or_else(|| format!("no row in {}", PREDICTIONS_TABLE))?;
    let back: PersistedPredictionRecord = serde_json::from_value(row)
        .map_err(|e| format!("stored row is not a prediction record: {}", e))?;
    if back != record {
        return Err(format!("expected {:?}, got {:?}", record, back));
    }
    Ok(())
}
