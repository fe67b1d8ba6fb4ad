//! Response normalizer: reduce freeform model text to typed prediction fields.
//!
//! Fields that would corrupt the caller's data model fail hard (`title`,
//! `description`, `impact`, `trend`, `accuracy` when non-numeric, and both
//! lists when absent). Cosmetic or advisory fields fall back instead:
//! an unknown `icon` becomes [`IconKind::Event`] and an out-of-range
//! `accuracy` is clamped into `[0, 100]`.

use serde_json::{Map, Value};

use crate::types::{IconKind, ImpactLevel, NormalizedPredictionFields, Trend};

/// Maximum number of characters of offending text kept for diagnostics.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Why a model response could not be normalized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedReason {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("top-level JSON value is not an object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' has unrecognized value '{value}'")]
    InvalidEnum { field: &'static str, value: String },

    #[error("field '{0}' is not a finite number")]
    NonFiniteNumber(&'static str),
}

impl MalformedReason {
    /// The response field responsible, when the failure is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            MalformedReason::MissingField(f)
            | MalformedReason::EmptyField(f)
            | MalformedReason::NonFiniteNumber(f)
            | MalformedReason::WrongType { field: f, .. }
            | MalformedReason::InvalidEnum { field: f, .. } => Some(f),
            MalformedReason::NoJsonObject
            | MalformedReason::InvalidJson(_)
            | MalformedReason::NotAnObject => None,
        }
    }
}

/// The generation service returned text that is not a valid prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed model response: {reason} (near: {snippet:?})")]
pub struct MalformedResponseError {
    pub reason: MalformedReason,
    /// Truncated copy of the text being parsed when the failure occurred.
    pub snippet: String,
}

impl MalformedResponseError {
    fn new(reason: MalformedReason, text: &str) -> Self {
        Self {
            reason,
            snippet: truncate(text, SNIPPET_MAX_CHARS),
        }
    }
}

/// Normalize raw model output into validated prediction fields.
pub fn normalize(raw: &str) -> Result<NormalizedPredictionFields, MalformedResponseError> {
    let unfenced = strip_code_fences(raw);
    let candidate = trim_to_object(&unfenced)
        .ok_or_else(|| MalformedResponseError::new(MalformedReason::NoJsonObject, raw))?;

    let value: Value = serde_json::from_str(candidate).map_err(|e| {
        MalformedResponseError::new(MalformedReason::InvalidJson(e.to_string()), candidate)
    })?;
    let obj = value
        .as_object()
        .ok_or_else(|| MalformedResponseError::new(MalformedReason::NotAnObject, candidate))?;

    decode_fields(obj).map_err(|reason| MalformedResponseError::new(reason, candidate))
}

/// Remove every triple-backtick fence marker along with an attached
/// language tag (` ```json `, ` ```JSON `, bare ` ``` `).
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-'))
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Slice from the first `{` to the last `}` inclusive.
fn trim_to_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn decode_fields(obj: &Map<String, Value>) -> Result<NormalizedPredictionFields, MalformedReason> {
    Ok(NormalizedPredictionFields {
        title: required_text(obj, "title")?,
        description: required_text(obj, "description")?,
        impact_level: required_enum(obj, "impact", ImpactLevel::parse)?,
        trend: required_enum(obj, "trend", Trend::parse)?,
        icon_kind: obj
            .get("icon")
            .and_then(Value::as_str)
            .and_then(IconKind::parse)
            .unwrap_or_default(),
        accuracy_percent: accuracy(obj)?,
        recommendations: string_list(obj, "recommendations")?,
        risk_factors: string_list(obj, "riskFactors")?,
    })
}

fn present<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, MalformedReason> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(MalformedReason::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn required_text(obj: &Map<String, Value>, field: &'static str) -> Result<String, MalformedReason> {
    let text = present(obj, field)?
        .as_str()
        .ok_or(MalformedReason::WrongType {
            field,
            expected: "a string",
        })?
        .trim();
    if text.is_empty() {
        return Err(MalformedReason::EmptyField(field));
    }
    Ok(text.to_string())
}

fn required_enum<T>(
    obj: &Map<String, Value>,
    field: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, MalformedReason> {
    let value = present(obj, field)?;
    let text = value.as_str().ok_or(MalformedReason::WrongType {
        field,
        expected: "a string",
    })?;
    parse(text).ok_or_else(|| MalformedReason::InvalidEnum {
        field,
        value: text.to_string(),
    })
}

/// Numeric accuracy, accepting numeric strings such as `"91"` or `"91%"`,
/// clamped into `[0, 100]`.
fn accuracy(obj: &Map<String, Value>) -> Result<f64, MalformedReason> {
    const FIELD: &str = "accuracy";
    let number = match present(obj, FIELD)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix('%').unwrap_or(s).trim().parse::<f64>().ok()
        }
        _ => {
            return Err(MalformedReason::WrongType {
                field: FIELD,
                expected: "a number",
            })
        }
    };
    match number {
        Some(n) if n.is_finite() => Ok(n.clamp(0.0, 100.0)),
        _ => Err(MalformedReason::NonFiniteNumber(FIELD)),
    }
}

/// List of strings. Non-string and blank elements are dropped; an empty
/// list is accepted.
fn string_list(obj: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, MalformedReason> {
    let items = present(obj, field)?
        .as_array()
        .ok_or(MalformedReason::WrongType {
            field,
            expected: "a list",
        })?;
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"title":"Gate Surge Expected","description":"Gates A and B will see a 40% flow increase.","impact":"high","trend":"increasing","icon":"crowd","accuracy":91,"recommendations":["Open Gate C","Add 10 staff to Gate A"],"riskFactors":["Weather delay","Late ticket scans"]}"#;

    fn with(field: &str, value: Value) -> String {
        let mut v: Value = serde_json::from_str(BODY).unwrap();
        v[field] = value;
        v.to_string()
    }

    fn without(field: &str) -> String {
        let mut v: Value = serde_json::from_str(BODY).unwrap();
        v.as_object_mut().unwrap().remove(field);
        v.to_string()
    }

    fn reason(raw: &str) -> MalformedReason {
        normalize(raw).unwrap_err().reason
    }

    #[test]
    fn normalizes_bare_json() {
        let fields = normalize(BODY).unwrap();
        assert_eq!(fields.title, "Gate Surge Expected");
        assert_eq!(fields.impact_level, ImpactLevel::High);
        assert_eq!(fields.trend, Trend::Increasing);
        assert_eq!(fields.icon_kind, IconKind::Crowd);
        assert_eq!(fields.accuracy_percent, 91.0);
        assert_eq!(fields.recommendations.len(), 2);
        assert_eq!(fields.risk_factors, vec!["Weather delay", "Late ticket scans"]);
    }

    #[test]
    fn fenced_wrapped_and_bare_are_equivalent() {
        let bare = normalize(BODY).unwrap();
        let fenced = normalize(&format!("```json\n{}\n```", BODY)).unwrap();
        let chatty = normalize(&format!("Sure! ```json\n{}\n``` Hope that helps!", BODY)).unwrap();
        let untagged = normalize(&format!("```\n{}\n```", BODY)).unwrap();
        let prose = normalize(&format!("Here is your result: {} Let me know if...", BODY)).unwrap();
        assert_eq!(bare, fenced);
        assert_eq!(bare, chatty);
        assert_eq!(bare, untagged);
        assert_eq!(bare, prose);
    }

    #[test]
    fn strips_fences_with_language_tags() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "\n{}\n");
        assert_eq!(strip_code_fences("```JSON{}```"), "{}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }

    #[test]
    fn missing_title_fails() {
        assert_eq!(reason(&without("title")), MalformedReason::MissingField("title"));
    }

    #[test]
    fn blank_description_fails() {
        assert_eq!(
            reason(&with("description", Value::from("   "))),
            MalformedReason::EmptyField("description")
        );
    }

    #[test]
    fn non_string_title_fails() {
        let r = reason(&with("title", Value::from(42)));
        assert_eq!(r.field(), Some("title"));
    }

    #[test]
    fn unknown_impact_fails() {
        assert_eq!(
            reason(&with("impact", Value::from("extreme"))),
            MalformedReason::InvalidEnum {
                field: "impact",
                value: "extreme".to_string()
            }
        );
    }

    #[test]
    fn unknown_trend_fails() {
        assert_eq!(reason(&with("trend", Value::from("sideways"))).field(), Some("trend"));
    }

    #[test]
    fn enum_matching_ignores_case() {
        let fields = normalize(&with("impact", Value::from("Medium"))).unwrap();
        assert_eq!(fields.impact_level, ImpactLevel::Medium);
    }

    #[test]
    fn missing_recommendations_fails() {
        assert_eq!(
            reason(&without("recommendations")),
            MalformedReason::MissingField("recommendations")
        );
    }

    #[test]
    fn null_risk_factors_counts_as_missing() {
        assert_eq!(
            reason(&with("riskFactors", Value::Null)),
            MalformedReason::MissingField("riskFactors")
        );
    }

    #[test]
    fn non_list_recommendations_fails() {
        assert_eq!(
            reason(&with("recommendations", Value::from("Open Gate C"))).field(),
            Some("recommendations")
        );
    }

    #[test]
    fn empty_lists_are_accepted() {
        let fields = normalize(&with("riskFactors", serde_json::json!([]))).unwrap();
        assert!(fields.risk_factors.is_empty());
    }

    #[test]
    fn non_string_list_elements_are_dropped() {
        let fields = normalize(&with(
            "recommendations",
            serde_json::json!(["Open Gate C", 7, null, {"x": 1}, "  ", "Call stewards"]),
        ))
        .unwrap();
        assert_eq!(fields.recommendations, vec!["Open Gate C", "Call stewards"]);
    }

    #[test]
    fn unknown_icon_falls_back_to_event() {
        let fields = normalize(&with("icon", Value::from("banana"))).unwrap();
        assert_eq!(fields.icon_kind, IconKind::Event);
        let fields = normalize(&without("icon")).unwrap();
        assert_eq!(fields.icon_kind, IconKind::Event);
    }

    #[test]
    fn accuracy_is_clamped() {
        assert_eq!(normalize(&with("accuracy", Value::from(150))).unwrap().accuracy_percent, 100.0);
        assert_eq!(normalize(&with("accuracy", Value::from(-5))).unwrap().accuracy_percent, 0.0);
    }

    #[test]
    fn accuracy_outside_advisory_band_is_kept() {
        let fields = normalize(&with("accuracy", Value::from(42.5))).unwrap();
        assert_eq!(fields.accuracy_percent, 42.5);
    }

    #[test]
    fn accuracy_numeric_strings_are_coerced() {
        assert_eq!(normalize(&with("accuracy", Value::from("88"))).unwrap().accuracy_percent, 88.0);
        assert_eq!(normalize(&with("accuracy", Value::from("93%"))).unwrap().accuracy_percent, 93.0);
    }

    #[test]
    fn non_numeric_accuracy_fails() {
        assert_eq!(
            reason(&with("accuracy", Value::from("very"))),
            MalformedReason::NonFiniteNumber("accuracy")
        );
        assert_eq!(reason(&with("accuracy", Value::Bool(true))).field(), Some("accuracy"));
        assert_eq!(reason(&without("accuracy")), MalformedReason::MissingField("accuracy"));
    }

    #[test]
    fn text_without_object_fails() {
        assert_eq!(reason("I cannot help with that."), MalformedReason::NoJsonObject);
        assert_eq!(reason(""), MalformedReason::NoJsonObject);
        assert_eq!(reason("} backwards {"), MalformedReason::NoJsonObject);
    }

    #[test]
    fn broken_json_reports_parser_error_and_snippet() {
        let err = normalize(r#"{"title": "Gate Surge", "impact": }"#).unwrap_err();
        assert!(matches!(err.reason, MalformedReason::InvalidJson(_)));
        assert!(err.snippet.contains("Gate Surge"));
    }

    #[test]
    fn snippet_is_truncated() {
        let long = format!("{{\"title\": \"{}\"", "x".repeat(1_000));
        let err = normalize(&format!("{}}}", long)).unwrap_err();
        assert!(err.snippet.chars().count() <= SNIPPET_MAX_CHARS + 3);
        assert!(err.snippet.ends_with("..."));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        assert_eq!(truncate(&text, 3), "ééé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
