//! Prediction data model: request, normalized fields, and the final result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Relative freshness label stamped on every result at creation.
pub const GENERATED_LABEL: &str = "Just now";

/// Caller-supplied parameters for a single prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// Free-text event category (e.g. "football match").
    pub event_type: String,
    /// Expected headcount.
    pub attendance_estimate: u64,
    /// Prediction horizon in minutes from now.
    pub time_window_minutes: i64,
    /// Free-text prediction category (e.g. "crowd_flow", "parking").
    pub prediction_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_circumstances: Option<String>,
}

impl PredictionRequest {
    pub fn new(
        event_type: impl Into<String>,
        attendance_estimate: u64,
        time_window_minutes: i64,
        prediction_kind: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            attendance_estimate,
            time_window_minutes,
            prediction_kind: prediction_kind.into(),
            weather_condition: None,
            special_circumstances: None,
        }
    }

    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather_condition = Some(weather.into());
        self
    }

    pub fn with_special_circumstances(mut self, circumstances: impl Into<String>) -> Self {
        self.special_circumstances = Some(circumstances.into());
        self
    }

    /// Display string for the prediction horizon, e.g. `"45 min"`.
    pub fn display_time(&self) -> String {
        format!("{} min", self.time_window_minutes)
    }
}

/// Defines a closed, lowercase-serialized enum with `ALL`, `as_str`, and
/// case-insensitive `parse`.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every permitted value, in prompt order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Case-insensitive match against the permitted values.
            pub fn parse(value: &str) -> Option<Self> {
                let value = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(value))
            }

            /// Permitted values joined for display, e.g. `"low, medium, high"`.
            pub fn permitted() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    /// How strongly a prediction affects operations.
    ImpactLevel { Low => "low", Medium => "medium", High => "high" }
}

closed_enum! {
    /// Direction the predicted quantity is moving.
    Trend { Increasing => "increasing", Decreasing => "decreasing", Stable => "stable" }
}

closed_enum! {
    /// Dashboard icon category. Purely cosmetic.
    IconKind {
        Crowd => "crowd",
        Temperature => "temperature",
        Traffic => "traffic",
        Prayer => "prayer",
        Event => "event",
    }
}

impl Default for IconKind {
    fn default() -> Self {
        IconKind::Event
    }
}

/// Structurally validated fields extracted from a model response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPredictionFields {
    pub title: String,
    pub description: String,
    pub impact_level: ImpactLevel,
    pub trend: Trend,
    pub icon_kind: IconKind,
    /// Always within `[0, 100]`.
    pub accuracy_percent: f64,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
}

/// The finished prediction record handed to callers and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub id: String,
    pub title: String,
    pub description: String,
    pub impact_level: ImpactLevel,
    pub trend: Trend,
    pub icon_kind: IconKind,
    pub accuracy_percent: f64,
    pub display_time: String,
    pub generated_label: String,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl PredictionResult {
    /// Combine normalized fields with per-call metadata.
    pub fn from_fields(
        id: String,
        fields: NormalizedPredictionFields,
        request: &PredictionRequest,
    ) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            impact_level: fields.impact_level,
            trend: fields.trend,
            icon_kind: fields.icon_kind,
            accuracy_percent: fields.accuracy_percent,
            display_time: request.display_time(),
            generated_label: GENERATED_LABEL.to_string(),
            recommendations: fields.recommendations,
            risk_factors: fields.risk_factors,
        }
    }

    /// Accuracy expressed as a 0–1 confidence score.
    pub fn confidence_score(&self) -> f64 {
        self.accuracy_percent / 100.0
    }
}
