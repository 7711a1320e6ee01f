use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use super::enums::{Condition, SubjectType};

/// Named feature measurements backing a verdict.
///
/// Ordered by key so iteration, serialization and export columns are
/// deterministic. Values are rounded to three decimals on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureDetails(BTreeMap<String, f32>);

impl FeatureDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f32) {
        self.0.insert(name.to_string(), (value * 1000.0).round() / 1000.0);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human-readable rendering of one measurement.
    pub fn display_value(&self, name: &str) -> Option<String> {
        self.get(name).map(format_measurement)
    }
}

pub fn format_measurement(value: f32) -> String {
    format!("{value:.3}")
}

/// `leaf_color_uniformity` → `Leaf Color Uniformity`.
pub fn feature_title(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Structured outcome of one analysis.
///
/// `subject_type` is derived from `condition` at construction, and
/// confidence is clamped into [0, 1], so neither invariant can be broken by
/// a caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    subject_type: SubjectType,
    #[serde(serialize_with = "serialize_condition")]
    condition: Condition,
    confidence: f32,
    details: FeatureDetails,
    timestamp: NaiveDateTime,
    source_name: String,
}

impl Verdict {
    pub fn new(
        condition: Condition,
        confidence: f32,
        details: FeatureDetails,
        source_name: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            subject_type: condition.subject_type(),
            condition,
            confidence,
            details,
            timestamp,
            source_name: source_name.into(),
        }
    }

    pub fn subject_type(&self) -> SubjectType {
        self.subject_type
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn details(&self) -> &FeatureDetails {
        &self.details
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Timestamp in the `YYYY-mm-dd HH:MM:SS` form used by history views.
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn serialize_condition<S: Serializer>(condition: &Condition, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(condition.label())
}
