use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

/// On-device peripheral that yields one value per channel in a fixed order.
///
/// Reads are synchronous and bounded; the poller treats a read as a single
/// non-suspending step.
pub trait LocalSensor {
    fn read(&mut self) -> Result<Vec<f64>>;
}

/// A channel exposed by the Linux industrial-I/O subsystem, e.g. `in_temp_input`.
#[derive(Debug, Clone, PartialEq)]
pub struct IioChannel {
    pub attribute: String,
    pub scale: f64,
}

/// Reads sysfs attributes from an IIO device directory such as
/// `/sys/bus/iio/devices/iio:device0`.
pub struct IioSensor {
    device: PathBuf,
    channels: Vec<IioChannel>,
}

impl IioSensor {
    pub fn new(device: impl AsRef<Path>, channels: Vec<IioChannel>) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            channels,
        }
    }

    fn read_channel(&self, channel: &IioChannel) -> Result<f64> {
        let path = self.device.join(&channel.attribute);
        let raw = fs::read_to_string(&path)?;
        let value: f64 = raw.trim().parse().map_err(|_| {
            Error::Parse(format!(
                "{} contained '{}', expected a number",
                path.display(),
                raw.trim()
            ))
        })?;
        Ok(value * channel.scale)
    }
}

impl LocalSensor for IioSensor {
    fn read(&mut self) -> Result<Vec<f64>> {
        self.channels
            .iter()
            .map(|channel| self.read_channel(channel))
            .collect()
    }
}

/// Simulated peripheral for headless runs: each channel drifts slowly around a base value.
pub struct DemoSensor {
    bases: Vec<f64>,
    step: u64,
}

impl DemoSensor {
    pub fn new(bases: Vec<f64>) -> Self {
        Self { bases, step: 0 }
    }
}

impl LocalSensor for DemoSensor {
    fn read(&mut self) -> Result<Vec<f64>> {
        let t = self.step as f64 * 0.3;
        self.step += 1;
        Ok(self
            .bases
            .iter()
            .enumerate()
            .map(|(idx, base)| base * (1.0 + 0.01 * (t + idx as f64).sin()))
            .collect())
    }
}
