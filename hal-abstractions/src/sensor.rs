//! Environmental sensor drivers

use core::fmt::Debug;

/// Source of ambient temperature readings in degrees Celsius
pub trait TemperatureSensor {
    /// Acquisition failure (timeout, checksum, missing device)
    type Error: Debug;

    fn read_temperature(&mut self) -> Result<f32, Self::Error>;
}

/// Source of relative humidity readings in percent
pub trait HumiditySensor {
    /// Acquisition failure (timeout, checksum, missing device)
    type Error: Debug;

    fn read_humidity(&mut self) -> Result<f32, Self::Error>;
}
