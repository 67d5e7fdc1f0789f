//! Analysis result model and the defensive parsing of the upload response
//!
//! Every field coming back from the service is untrusted. Missing or `null`
//! fields fall back to empty values, and the text, risk and PII fields accept
//! scalars of an unexpected type by coercing them for display. Only a body
//! that is not a JSON object, or a structural field (`detected_pii`,
//! `risk_assessment`) of the wrong shape, is treated as malformed.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::handle::PreviewHandle;
use crate::{Error, Result};

/// One detected PII token, in the order the service reported it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPii {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
}

/// Risk classification reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Anything outside the known set, kept verbatim for display
    Unrecognized(String),
}

/// Display style for a risk badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskStyle {
    Green,
    Yellow,
    Red,
    Gray,
}

impl RiskStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStyle::Green => "green",
            RiskStyle::Yellow => "yellow",
            RiskStyle::Red => "red",
            RiskStyle::Gray => "gray",
        }
    }
}

impl RiskLevel {
    pub fn style(&self) -> RiskStyle {
        match self {
            RiskLevel::Low => RiskStyle::Green,
            RiskLevel::Medium => RiskStyle::Yellow,
            RiskLevel::High => RiskStyle::Red,
            RiskLevel::Unrecognized(_) => RiskStyle::Gray,
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Unrecognized(String::new())
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Low" => RiskLevel::Low,
            "Medium" => RiskLevel::Medium,
            "High" => RiskLevel::High,
            _ => RiskLevel::Unrecognized(value),
        }
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => RiskLevel::default(),
            Value::String(level) => RiskLevel::from(level),
            other => RiskLevel::Unrecognized(other.to_string()),
        })
    }
}

impl From<RiskLevel> for String {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => "Low".to_string(),
            RiskLevel::Medium => "Medium".to_string(),
            RiskLevel::High => "High".to_string(),
            RiskLevel::Unrecognized(other) => other,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("Low"),
            RiskLevel::Medium => f.write_str("Medium"),
            RiskLevel::High => f.write_str("High"),
            RiskLevel::Unrecognized(other) if other.is_empty() => f.write_str("Unknown"),
            RiskLevel::Unrecognized(other) => f.write_str(other),
        }
    }
}

/// Coarse summary of PII exposure.
///
/// `pii_count` is reported as-is and may disagree with the detected list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub risk_level: RiskLevel,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pii_count: u64,
    #[serde(default, deserialize_with = "lenient_score")]
    pub risk_score: f64,
}

/// Output of one successful analyze call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub extracted_text: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub redacted_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detected_pii: Vec<DetectedPii>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub risk_assessment: RiskAssessment,
    /// Attached after the fact, never part of the wire format
    #[serde(skip)]
    pub redacted_image: Option<PreviewHandle>,
}

impl AnalysisResult {
    /// Parse an upload response body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(Error::MalformedResponse(
                "expected a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Whether the reported count agrees with the detected list
    pub fn pii_count_matches(&self) -> bool {
        self.risk_assessment.pii_count == self.detected_pii.len() as u64
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strings pass through; other scalars are shown as their JSON text
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Whole, float or numeric-string counts; anything else counts as zero
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(count) = value.as_u64() {
        return Ok(count);
    }
    let float = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(match float {
        Some(f) if f.is_finite() && f >= 0.0 => f as u64,
        _ => 0,
    })
}

fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}
