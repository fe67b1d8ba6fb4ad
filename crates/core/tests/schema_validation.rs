//! Normalizes the recorded model responses under tests/fixtures/responses and
//! validates the resulting prediction records against
//! schema/prediction-result.schema.json.

use std::path::{Path, PathBuf};

use arena_pulse_core::{
    normalize, IconKind, ImpactLevel, MalformedReason, PredictionRequest, PredictionResult, Trend,
};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/responses")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

fn schema_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../schema")
        .join(name)
}

fn result_validator() -> jsonschema::Validator {
    let path = schema_path("prediction-result.schema.json");
    let src = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", path.display(), e));
    let schema: serde_json::Value = serde_json::from_str(&src).unwrap();
    jsonschema::validator_for(&schema).unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

fn request() -> PredictionRequest {
    PredictionRequest::new("football match", 65_000, 30, "crowd_flow")
}

#[test]
fn fenced_fixture_normalizes() {
    let fields = normalize(&fixture("fenced_parking.txt")).unwrap();
    assert_eq!(fields.title, "North Lot Nearing Capacity");
    assert_eq!(fields.impact_level, ImpactLevel::Medium);
    assert_eq!(fields.icon_kind, IconKind::Traffic);
    assert_eq!(fields.recommendations.len(), 3);
}

#[test]
fn conversational_fixture_normalizes() {
    let fields = normalize(&fixture("chatty_prayer.txt")).unwrap();
    assert_eq!(fields.icon_kind, IconKind::Prayer);
    assert_eq!(fields.accuracy_percent, 92.0);
    assert_eq!(fields.trend, Trend::Increasing);
}

#[test]
fn lenient_fields_recover() {
    let fields = normalize(&fixture("overconfident_weather.txt")).unwrap();
    assert_eq!(fields.icon_kind, IconKind::Event);
    assert_eq!(fields.accuracy_percent, 100.0);
    assert_eq!(fields.risk_factors, vec!["No shade in upper tier"]);
}

#[test]
fn hard_fail_fixtures_are_rejected() {
    let err = normalize(&fixture("extreme_impact.txt")).unwrap_err();
    assert_eq!(err.reason.field(), Some("impact"));

    let err = normalize(&fixture("refusal.txt")).unwrap_err();
    assert_eq!(err.reason, MalformedReason::NoJsonObject);
    assert!(err.snippet.starts_with("I'm sorry"));
}

#[test]
fn normalized_results_validate_against_schema() {
    let validator = result_validator();
    let mut tested = 0usize;
    let mut failures = Vec::new();

    for name in [
        "fenced_parking.txt",
        "chatty_prayer.txt",
        "overconfident_weather.txt",
    ] {
        let fields = normalize(&fixture(name)).unwrap();
        let result = PredictionResult::from_fields(format!("fixture-{}", tested), fields, &request());
        let instance = serde_json::to_value(&result).unwrap();
        if let Err(error) = validator.validate(&instance) {
            failures.push(format!("{}: {}", name, error));
        }
        tested += 1;
    }

    assert!(
        failures.is_empty(),
        "Schema validation failed for {} of {} fixtures:\n{}",
        failures.len(),
        tested,
        failures.join("\n")
    );
}

#[test]
fn request_schema_accepts_serialized_requests() {
    let path = schema_path("prediction-request.schema.json");
    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let validator = jsonschema::validator_for(&schema).unwrap();

    let full = request()
        .with_weather("light rain")
        .with_special_circumstances("cup final");
    assert!(validator.is_valid(&serde_json::to_value(request()).unwrap()));
    assert!(validator.is_valid(&serde_json::to_value(full).unwrap()));
    assert!(!validator.is_valid(&serde_json::json!({
        "eventType": "concert",
        "attendanceEstimate": -1,
        "timeWindowMinutes": 10,
        "predictionKind": "parking"
    })));
}
