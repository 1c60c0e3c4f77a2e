//! Static sensor descriptors and the values they produce.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod format;
pub mod local;

pub use format::{FixedFormat, ValueFormat};
pub use local::{DemoSensor, IioSensor, LocalSensor};

/// Shown wherever a sensor has not produced its first reading yet.
pub const PLACEHOLDER: &str = "??";

/// Raw value as delivered by a peripheral (numeric) or the remote service (usually text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl SensorValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Number(n) => Some(*n),
            SensorValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{n}"),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for SensorValue {
    fn from(value: f64) -> Self {
        SensorValue::Number(value)
    }
}

impl From<&str> for SensorValue {
    fn from(value: &str) -> Self {
        SensorValue::Text(value.to_string())
    }
}

/// Where a sensor's readings come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSource {
    /// Channel index into the local peripheral's ordered read, plus the JSON key.
    Local { channel: usize, key: String },
    /// Entity id on the remote telemetry service.
    Remote { entity_id: String },
}

/// Immutable per-sensor configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDescriptor {
    /// Multi-line label; `\n` separates display lines.
    pub title: String,
    pub source: SensorSource,
    pub format: ValueFormat,
}

impl SensorDescriptor {
    pub fn local(title: impl Into<String>, key: impl Into<String>, channel: usize) -> Self {
        Self {
            title: title.into(),
            source: SensorSource::Local {
                channel,
                key: key.into(),
            },
            format: ValueFormat::Raw,
        }
    }

    pub fn remote(title: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: SensorSource::Remote {
                entity_id: entity_id.into(),
            },
            format: ValueFormat::Raw,
        }
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, SensorSource::Local { .. })
    }

    /// Title collapsed onto one line, as used by the HTML table and single-item pages.
    pub fn flat_title(&self) -> String {
        self.title.replace('\n', " ")
    }

    /// Display string for an optional value; absent values become [`PLACEHOLDER`].
    pub fn display_value(&self, value: Option<&SensorValue>) -> String {
        match value {
            Some(value) => self.format.format(value),
            None => PLACEHOLDER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_values_parse_as_numbers_when_possible() {
        assert_eq!(SensorValue::from("21.5").as_f64(), Some(21.5));
        assert_eq!(SensorValue::from("unavailable").as_f64(), None);
        assert_eq!(SensorValue::from(3.0).as_f64(), Some(3.0));
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            SensorValue::from(1.5),
            SensorValue::from("on"),
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"on"]"#);
    }

    #[test]
    fn absent_value_renders_placeholder() {
        let sensor = SensorDescriptor::remote("Outdoors\nTemp. (C)", "sensor.temperature_outdoor");
        assert_eq!(sensor.display_value(None), PLACEHOLDER);
        assert_eq!(sensor.flat_title(), "Outdoors Temp. (C)");
    }
}
