//! Building a [`PredictionRequest`] from command-line flags or a JSON file.

use std::path::PathBuf;

use arena_pulse_core::PredictionRequest;
use clap::Args;

static REQUEST_SCHEMA_STR: &str = include_str!("../../../schema/prediction-request.schema.json");

/// Request fields shared by `predict` and `prompt`.
#[derive(Debug, Clone, Args)]
pub(crate) struct RequestArgs {
    /// JSON file holding a complete request (camelCase fields)
    #[arg(long, conflicts_with_all = ["event_type", "attendance", "window", "kind"])]
    pub request: Option<PathBuf>,

    /// Event type, e.g. "football match"
    #[arg(long)]
    pub event_type: Option<String>,

    /// Expected attendance
    #[arg(long)]
    pub attendance: Option<u64>,

    /// Prediction window in minutes
    #[arg(long, allow_negative_numbers = true)]
    pub window: Option<i64>,

    /// Prediction kind, e.g. crowd_flow, parking, weather
    #[arg(long)]
    pub kind: Option<String>,

    /// Current weather condition
    #[arg(long)]
    pub weather: Option<String>,

    /// Special circumstances worth mentioning
    #[arg(long)]
    pub special: Option<String>,
}

impl RequestArgs {
    pub(crate) fn resolve(&self) -> Result<PredictionRequest, String> {
        if let Some(path) = &self.request {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
            let mut request = parse_request(&content)
                .map_err(|e| format!("invalid request in '{}': {}", path.display(), e))?;
            if let Some(weather) = &self.weather {
                request.weather_condition = Some(weather.clone());
            }
            if let Some(special) = &self.special {
                request.special_circumstances = Some(special.clone());
            }
            return Ok(request);
        }

        let event_type = present(&self.event_type);
        let kind = present(&self.kind);

        // Every absent flag is reported at once, in declaration order.
        let mut missing = Vec::new();
        if event_type.is_none() {
            missing.push("--event-type");
        }
        if self.attendance.is_none() {
            missing.push("--attendance");
        }
        if self.window.is_none() {
            missing.push("--window");
        }
        if kind.is_none() {
            missing.push("--kind");
        }

        match (event_type, self.attendance, self.window, kind) {
            (Some(event_type), Some(attendance), Some(window), Some(kind)) => {
                let mut request = PredictionRequest::new(event_type, attendance, window, kind);
                request.weather_condition = self.weather.clone();
                request.special_circumstances = self.special.clone();
                Ok(request)
            }
            _ => Err(format!(
                "missing {} (or pass --request <file.json>)",
                missing.join(", ")
            )),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Compile the published request schema.
pub(crate) fn request_validator() -> Result<jsonschema::Validator, String> {
    let schema: serde_json::Value = serde_json::from_str(REQUEST_SCHEMA_STR)
        .map_err(|e| format!("internal error: failed to parse request schema: {}", e))?;
    jsonschema::validator_for(&schema)
        .map_err(|e| format!("internal error: failed to compile request schema: {}", e))
}

/// Validate `value` against the request schema, then decode it.
pub(crate) fn validate_request(
    validator: &jsonschema::Validator,
    value: serde_json::Value,
) -> Result<PredictionRequest, String> {
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("{}", e))
        .collect();
    if !errors.is_empty() {
        return Err(errors.join("; "));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn parse_request(content: &str) -> Result<PredictionRequest, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    validate_request(&request_validator()?, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> RequestArgs {
        RequestArgs {
            request: None,
            event_type: Some("football match".to_string()),
            attendance: Some(65_000),
            window: Some(30),
            kind: Some("crowd_flow".to_string()),
            weather: None,
            special: None,
        }
    }

    #[test]
    fn builds_from_flags() {
        let request = flags().resolve().unwrap();
        assert_eq!(request, PredictionRequest::new("football match", 65_000, 30, "crowd_flow"));
    }

    #[test]
    fn reports_the_missing_flag() {
        let mut args = flags();
        args.kind = None;
        let err = args.resolve().unwrap_err();
        assert!(err.contains("--kind"), "got {}", err);
    }

    #[test]
    fn reports_every_missing_flag_in_order() {
        let mut args = flags();
        args.window = None;
        args.kind = Some("  ".to_string());
        let err = args.resolve().unwrap_err();
        assert!(err.starts_with("missing --window, --kind"), "got {}", err);
        assert!(!err.contains("--event-type"), "got {}", err);
    }

    #[test]
    fn schema_rejects_unknown_and_missing_fields() {
        let validator = request_validator().unwrap();
        let err = validate_request(
            &validator,
            serde_json::json!({"eventType": "concert", "attendanceEstimate": 100}),
        )
        .unwrap_err();
        assert!(err.contains("timeWindowMinutes"), "got {}", err);

        assert!(validate_request(
            &validator,
            serde_json::json!({
                "eventType": "concert",
                "attendanceEstimate": 100,
                "timeWindowMinutes": 15,
                "predictionKind": "parking",
                "mood": "festive"
            }),
        )
        .is_err());
    }

    #[test]
    fn schema_accepts_a_full_request() {
        let request = validate_request(
            &request_validator().unwrap(),
            serde_json::json!({
                "eventType": "concert",
                "attendanceEstimate": 20000,
                "timeWindowMinutes": 45,
                "predictionKind": "parking",
                "weatherCondition": "clear"
            }),
        )
        .unwrap();
        assert_eq!(request.display_time(), "45 min");
        assert_eq!(request.weather_condition.as_deref(), Some("clear"));
    }
}
