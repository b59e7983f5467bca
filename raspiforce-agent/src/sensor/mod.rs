//! Temperature sensor access
//!
//! The physical sensor is a DS18B20 on the 1-Wire bus, exposed by the
//! `w1-therm` kernel driver as a two-line `w1_slave` text file.

pub mod w1;

use crate::error::SensorError;

pub use w1::{parse_w1_slave, W1ThermSensor};

/// Source of Celsius readings
#[allow(async_fn_in_trait)]
pub trait TemperatureSource {
    /// Take one reading in degrees Celsius
    async fn read_celsius(&mut self) -> Result<f64, SensorError>;

    /// Release the device; called once at shutdown
    fn release(&mut self) {}
}
