use serde::{Deserialize, Serialize};

use super::SensorValue;

/// Per-sensor display formatter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFormat {
    /// Value shown as delivered.
    #[default]
    Raw,
    /// `value / divisor` with a fixed number of decimals and a suffix.
    Fixed(FixedFormat),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedFormat {
    #[serde(default)]
    pub decimals: u8,
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

fn default_divisor() -> f64 {
    1.0
}

impl ValueFormat {
    pub fn fixed(decimals: u8) -> Self {
        ValueFormat::Fixed(FixedFormat {
            decimals,
            divisor: default_divisor(),
            suffix: String::new(),
        })
    }

    pub fn with_divisor(self, divisor: f64) -> Self {
        match self {
            ValueFormat::Fixed(fixed) => ValueFormat::Fixed(FixedFormat { divisor, ..fixed }),
            raw => raw,
        }
    }

    pub fn with_suffix(self, suffix: impl Into<String>) -> Self {
        match self {
            ValueFormat::Fixed(fixed) => ValueFormat::Fixed(FixedFormat {
                suffix: suffix.into(),
                ..fixed
            }),
            raw => raw,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ValueFormat::Raw)
    }

    pub fn format(&self, value: &SensorValue) -> String {
        match self {
            ValueFormat::Raw => value.to_string(),
            ValueFormat::Fixed(fixed) => match value.as_f64() {
                Some(n) => format!(
                    "{:.*}{}",
                    fixed.decimals as usize,
                    n / fixed.divisor,
                    fixed.suffix
                ),
                // "unavailable", "unknown" and friends from the remote service
                None => value.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_passes_value_through() {
        assert_eq!(ValueFormat::Raw.format(&SensorValue::from("12")), "12");
        assert_eq!(ValueFormat::Raw.format(&SensorValue::from(21.25)), "21.25");
    }

    #[test]
    fn fixed_matches_badge_formats() {
        let temp = ValueFormat::fixed(1);
        assert_eq!(temp.format(&SensorValue::from(21.34)), "21.3");

        let pressure = ValueFormat::fixed(0).with_divisor(100.0);
        assert_eq!(pressure.format(&SensorValue::from(101_325.0)), "1013");

        let humidity = ValueFormat::fixed(0).with_suffix("%");
        assert_eq!(humidity.format(&SensorValue::from("47.2")), "47%");
    }

    #[test]
    fn fixed_keeps_non_numeric_text() {
        let temp = ValueFormat::fixed(1);
        assert_eq!(temp.format(&SensorValue::from("unavailable")), "unavailable");
    }

    #[test]
    fn deserializes_tagged_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: ValueFormat,
        }
        let parsed: Wrapper =
            toml::from_str(r#"format = { kind = "fixed", decimals = 0, divisor = 1000.0 }"#)
                .unwrap();
        assert_eq!(parsed.format, ValueFormat::fixed(0).with_divisor(1000.0));
    }
}
