use crate::{
    sensors::{SensorDescriptor, SensorSource, ValueFormat},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

pub mod loader;

pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";
pub const DEFAULT_REMOTE_PORT: u16 = 8123;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REMOTE_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(30);
pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";
pub const DEFAULT_LOCAL_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_ITEMS_PER_PAGE: usize = 3;
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_RENDER_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_AUTOSCROLL_INTERVAL: Duration = Duration::from_secs(5);
const CONFIG_DIR_NAME: &str = ".homebadger";
const CONFIG_FILE_NAME: &str = "config.toml";

/// User-supplied settings loaded from the config file. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server_port: u16,
    pub remote: RemoteConfig,
    pub local: LocalConfig,
    pub display: DisplayConfig,
    pub buttons: ButtonConfig,
    pub local_sensors: Vec<LocalSensorConfig>,
    pub remote_sensors: Vec<RemoteSensorConfig>,
}

/// Connection settings for the remote telemetry service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub token: String,
    #[serde(with = "human_duration")]
    pub request_timeout: Duration,
    #[serde(with = "human_duration")]
    pub poll_interval: Duration,
    #[serde(with = "human_duration")]
    pub staleness: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    #[default]
    Demo,
    Iio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    pub kind: LocalKind,
    pub device: String,
    #[serde(with = "human_duration")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub items_per_page: usize,
    #[serde(with = "human_duration")]
    pub settle_interval: Duration,
    #[serde(with = "human_duration")]
    pub poll_interval: Duration,
    #[serde(with = "human_duration")]
    pub autoscroll_interval: Duration,
}

/// BCM pin numbers for the four logical buttons. Unset pins are never polled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ButtonConfig {
    pub prev: Option<u8>,
    pub next: Option<u8>,
    pub autoscroll: Option<u8>,
    pub page_size: Option<u8>,
}

impl ButtonConfig {
    pub fn any_configured(&self) -> bool {
        self.prev.is_some()
            || self.next.is_some()
            || self.autoscroll.is_some()
            || self.page_size.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalSensorConfig {
    pub title: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_value: Option<f64>,
    #[serde(default, skip_serializing_if = "ValueFormat::is_raw")]
    pub format: ValueFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSensorConfig {
    pub title: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "ValueFormat::is_raw")]
    pub format: ValueFormat,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            display: DisplayConfig::default(),
            buttons: ButtonConfig::default(),
            local_sensors: default_local_sensors(),
            remote_sensors: Vec::new(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REMOTE_HOST.to_string(),
            port: DEFAULT_REMOTE_PORT,
            token: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_REMOTE_POLL_INTERVAL,
            staleness: DEFAULT_STALENESS,
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            kind: LocalKind::default(),
            device: DEFAULT_IIO_DEVICE.to_string(),
            poll_interval: DEFAULT_LOCAL_POLL_INTERVAL,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            poll_interval: DEFAULT_RENDER_POLL_INTERVAL,
            autoscroll_interval: DEFAULT_AUTOSCROLL_INTERVAL,
        }
    }
}

/// The four BME688 channels the badge carries on board.
fn default_local_sensors() -> Vec<LocalSensorConfig> {
    vec![
        LocalSensorConfig {
            title: "BME688\nTemp. (C)".into(),
            key: "bme688_temperature".into(),
            attribute: Some("in_temp_input".into()),
            scale: 0.001,
            demo_value: Some(21.5),
            format: ValueFormat::fixed(1),
        },
        LocalSensorConfig {
            title: "BME688\nPressure\n(hPa)".into(),
            key: "bme688_pressure".into(),
            attribute: Some("in_pressure_input".into()),
            // IIO reports kPa
            scale: 1000.0,
            demo_value: Some(101_325.0),
            format: ValueFormat::fixed(0).with_divisor(100.0),
        },
        LocalSensorConfig {
            title: "BME688\nHumidity".into(),
            key: "bme688_humidity".into(),
            attribute: Some("in_humidityrelative_input".into()),
            scale: 0.001,
            demo_value: Some(45.0),
            format: ValueFormat::fixed(0).with_suffix("%"),
        },
        LocalSensorConfig {
            title: "BME688 Gas\nResistance\n(kOhm)".into(),
            key: "bme688_gas_resistance".into(),
            attribute: Some("in_resistance_input".into()),
            scale: 1.0,
            demo_value: Some(120_000.0),
            format: ValueFormat::fixed(0).with_divisor(1000.0),
        },
    ]
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    /// All descriptors, local sensors first; a local sensor's channel is its list position.
    pub fn descriptors(&self) -> Vec<SensorDescriptor> {
        let local = self
            .local_sensors
            .iter()
            .enumerate()
            .map(|(channel, s)| SensorDescriptor {
                title: s.title.clone(),
                source: SensorSource::Local {
                    channel,
                    key: s.key.clone(),
                },
                format: s.format.clone(),
            });
        let remote = self.remote_sensors.iter().map(|s| SensorDescriptor {
            title: s.title.clone(),
            source: SensorSource::Remote {
                entity_id: s.entity_id.clone(),
            },
            format: s.format.clone(),
        });
        local.chain(remote).collect()
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.local_sensors.is_empty() && cfg.remote_sensors.is_empty() {
        return Err(Error::InvalidArgs(
            "at least one local or remote sensor must be configured".into(),
        ));
    }

    let mut keys = HashSet::new();
    for sensor in &cfg.local_sensors {
        if sensor.key.trim().is_empty() {
            return Err(Error::InvalidArgs(format!(
                "local sensor '{}' needs a non-empty key",
                sensor.title.replace('\n', " ")
            )));
        }
        if !keys.insert(sensor.key.as_str()) {
            return Err(Error::InvalidArgs(format!(
                "duplicate local sensor key '{}'",
                sensor.key
            )));
        }
        if cfg.local.kind == LocalKind::Iio && sensor.attribute.is_none() {
            return Err(Error::InvalidArgs(format!(
                "local sensor '{}' needs an attribute when local.kind = \"iio\"",
                sensor.key
            )));
        }
    }

    for sensor in &cfg.remote_sensors {
        if sensor.entity_id.trim().is_empty() {
            return Err(Error::InvalidArgs(format!(
                "remote sensor '{}' needs a non-empty entity_id",
                sensor.title.replace('\n', " ")
            )));
        }
    }

    if !crate::state::PAGE_SIZES.contains(&cfg.display.items_per_page) {
        return Err(Error::InvalidArgs(format!(
            "display.items_per_page must be one of {:?}",
            crate::state::PAGE_SIZES
        )));
    }

    let intervals = [
        ("remote.request_timeout", cfg.remote.request_timeout),
        ("remote.poll_interval", cfg.remote.poll_interval),
        ("remote.staleness", cfg.remote.staleness),
        ("local.poll_interval", cfg.local.poll_interval),
        ("display.settle_interval", cfg.display.settle_interval),
        ("display.poll_interval", cfg.display.poll_interval),
        ("display.autoscroll_interval", cfg.display.autoscroll_interval),
    ];
    for (name, value) in intervals {
        if value.is_zero() {
            return Err(Error::InvalidArgs(format!("{name} must be greater than zero")));
        }
    }

    Ok(())
}

/// Durations written as human strings ("500ms", "30s").
mod human_duration {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}
