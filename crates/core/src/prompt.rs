//! Prompt construction for the generation service.
//!
//! The prompt restates the request and carries the output contract the
//! normalizer enforces. Permitted enum values are rendered from the enum
//! definitions themselves.

use crate::types::{IconKind, ImpactLevel, PredictionRequest, Trend};

/// Advisory accuracy band requested from the model. Not enforced on parse.
pub const ADVISORY_ACCURACY_MIN: u8 = 80;
pub const ADVISORY_ACCURACY_MAX: u8 = 98;

/// Render a request into the instruction sent to the generation service.
pub fn build(request: &PredictionRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are an operations analyst for a large sports stadium. \
         Produce a short operational prediction for the scenario below.\n\n",
    );

    prompt.push_str("## Scenario\n\n");
    prompt.push_str(&format!("- Event type: {}\n", request.event_type.trim()));
    prompt.push_str(&format!(
        "- Expected attendance: {}\n",
        group_thousands(request.attendance_estimate as i128)
    ));
    prompt.push_str(&format!(
        "- Prediction window: next {} minutes\n",
        group_thousands(request.time_window_minutes as i128)
    ));
    prompt.push_str(&format!(
        "- Prediction type: {}\n",
        request.prediction_kind.trim()
    ));
    if let Some(weather) = present(&request.weather_condition) {
        prompt.push_str(&format!("- Weather: {}\n", weather));
    }
    if let Some(special) = present(&request.special_circumstances) {
        prompt.push_str(&format!("- Special circumstances: {}\n", special));
    }
    prompt.push('\n');

    prompt.push_str("## Output format\n\n");
    prompt.push_str(
        "Respond with ONLY a JSON object. No explanation, no markdown, no code fences. \
         The object must have exactly these fields:\n\n",
    );
    prompt.push_str(&format!(
        r#"{{
  "title": "<short headline for the prediction>",
  "description": "<one or two sentences describing what will happen and where>",
  "impact": "{impact}",
  "trend": "{trend}",
  "icon": "{icon}",
  "accuracy": <number>,
  "recommendations": ["<action>", ...],
  "riskFactors": ["<risk>", ...]
}}"#,
        impact = ImpactLevel::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("\" | \""),
        trend = Trend::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("\" | \""),
        icon = IconKind::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("\" | \""),
    ));
    prompt.push_str("\n\nRules:\n");
    prompt.push_str(&format!(
        "- \"impact\" must be one of: {}\n",
        ImpactLevel::permitted()
    ));
    prompt.push_str(&format!(
        "- \"trend\" must be one of: {}\n",
        Trend::permitted()
    ));
    prompt.push_str(&format!(
        "- \"icon\" must be one of: {}\n",
        IconKind::permitted()
    ));
    prompt.push_str(&format!(
        "- \"accuracy\" is your confidence as a number between 0 and 100, typically between {} and {}\n",
        ADVISORY_ACCURACY_MIN, ADVISORY_ACCURACY_MAX
    ));
    prompt.push_str("- \"recommendations\" must contain 3 to 5 short, actionable strings\n");
    prompt.push_str("- \"riskFactors\" must contain 2 to 3 short strings\n");
    prompt.push_str("- Do not add any text before or after the JSON object.\n");

    prompt
}

/// Optional field value, or `None` when absent or blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Locale-free thousands grouping: `65000` -> `"65,000"`.
pub fn group_thousands(n: i128) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
