//! DS18B20 reader over the `w1_slave` device file
//!
//! Device file format:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line ends with `YES` once the CRC check passed; the second
//! carries the temperature in milli-degrees after `t=`.

use super::TemperatureSource;
use crate::config::SensorConfig;
use crate::error::SensorError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info, warn};

const VALID_MARKER: &str = "YES";
const TEMP_MARKER: &str = "t=";
const KERNEL_MODULES: &[&str] = &["w1-gpio", "w1-therm"];

/// Parse a `w1_slave` snapshot.
///
/// Returns `Ok(None)` while the device has not flagged the sample as valid.
pub fn parse_w1_slave(raw: &str) -> Result<Option<f64>, SensorError> {
    let mut lines = raw.lines();
    let status = lines
        .next()
        .ok_or_else(|| SensorError::Malformed("empty device file".to_string()))?;
    if !status.trim().ends_with(VALID_MARKER) {
        return Ok(None);
    }

    let data = lines
        .next()
        .ok_or_else(|| SensorError::Malformed("missing temperature line".to_string()))?;
    let pos = data
        .find(TEMP_MARKER)
        .ok_or_else(|| SensorError::Malformed(format!("no {TEMP_MARKER} in {data:?}")))?;
    let payload = data[pos + TEMP_MARKER.len()..].trim();
    let millis: i64 = payload
        .parse()
        .map_err(|_| SensorError::Malformed(format!("non-numeric temperature {payload:?}")))?;

    Ok(Some(millis as f64 / 1000.0))
}

/// 1-Wire thermometer backed by a device file
#[derive(Debug)]
pub struct W1ThermSensor {
    device_file: PathBuf,
    retry_interval: Duration,
    max_attempts: u32,
}

impl W1ThermSensor {
    pub fn new(device_file: impl Into<PathBuf>, retry_interval: Duration, max_attempts: u32) -> Self {
        Self {
            device_file: device_file.into(),
            retry_interval,
            max_attempts,
        }
    }

    /// Load the 1-Wire drivers and locate the first matching device
    pub async fn discover(config: &SensorConfig) -> Result<Self, SensorError> {
        if config.load_kernel_modules {
            Self::load_kernel_modules().await;
        }

        let device_dir = Self::find_device_dir(&config.base_dir, &config.device_prefix).await?;
        let device_file = device_dir.join("w1_slave");
        info!("Using temperature sensor at {}", device_file.display());

        Ok(Self::new(
            device_file,
            config.retry_interval(),
            config.max_attempts,
        ))
    }

    pub fn device_file(&self) -> &Path {
        &self.device_file
    }

    async fn load_kernel_modules() {
        for module in KERNEL_MODULES {
            match AsyncCommand::new("modprobe").arg(module).output().await {
                Ok(output) if output.status.success() => debug!("Loaded kernel module {}", module),
                Ok(output) => warn!(
                    "modprobe {} failed: {}",
                    module,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => warn!("Failed to run modprobe {}: {}", module, e),
            }
        }
    }

    async fn find_device_dir(base_dir: &Path, prefix: &str) -> Result<PathBuf, SensorError> {
        let not_found = || SensorError::DeviceNotFound {
            base_dir: base_dir.to_path_buf(),
            prefix: prefix.to_string(),
        };

        let mut entries = tokio::fs::read_dir(base_dir).await.map_err(|_| not_found())?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| SensorError::Io {
            path: base_dir.to_path_buf(),
            source,
        })? {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                candidates.push(entry.path());
            }
        }

        candidates.sort();
        candidates.into_iter().next().ok_or_else(not_found)
    }

}

async fn read_device(path: &Path) -> Result<String, SensorError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SensorError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Drop the first snapshot, then re-read until one is flagged valid
async fn read_until_valid<R, Fut>(
    mut read: R,
    retry_interval: Duration,
    max_attempts: u32,
) -> Result<f64, SensorError>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<String, SensorError>>,
{
    // First snapshot after a conversion is stale
    let _ = read().await?;

    let mut attempts = 0;
    loop {
        let raw = read().await?;
        if let Some(celsius) = parse_w1_slave(&raw)? {
            return Ok(celsius);
        }
        attempts += 1;
        if attempts >= max_attempts {
            return Err(SensorError::Timeout { attempts });
        }
        tokio::time::sleep(retry_interval).await;
    }
}

impl TemperatureSource for W1ThermSensor {
    async fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let path = self.device_file.as_path();
        read_until_valid(|| read_device(path), self.retry_interval, self.max_attempts).await
    }

    fn release(&mut self) {
        debug!("Released sensor {}", self.device_file.display());
    }
}
