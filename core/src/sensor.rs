//! Sensor selection and sampling
//!
//! Which physical device supplies each quantity is decided once, when the
//! [`SensorBank`] is built. A failed read is logged and reported as an
//! absent value; it is never retried within a cycle.

use hal_abstractions::{HumiditySensor, TemperatureSensor};

use crate::fmt::Debug2Format;

/// One sample cycle's values; `None` means not available
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureSource {
    /// Combined temperature/humidity sensor
    #[default]
    Primary,
    /// Die temperature of the real-time clock
    Rtc,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HumiditySource {
    #[default]
    Primary,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorSources {
    pub temperature: TemperatureSource,
    pub humidity: HumiditySource,
}

/// Anything that can produce a reading on demand
pub trait Sampler {
    fn sample(&mut self) -> SensorReading;
}

/// Placeholder for an absent device; every read fails
#[derive(Debug, Default)]
pub struct NoSensor;

/// Error of [`NoSensor`]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFitted;

impl TemperatureSensor for NoSensor {
    type Error = NotFitted;

    fn read_temperature(&mut self) -> Result<f32, NotFitted> {
        Err(NotFitted)
    }
}

impl HumiditySensor for NoSensor {
    type Error = NotFitted;

    fn read_humidity(&mut self) -> Result<f32, NotFitted> {
        Err(NotFitted)
    }
}

/// Primary combined sensor plus an alternate temperature source
pub struct SensorBank<P, A = NoSensor> {
    primary: P,
    alternate: A,
    sources: SensorSources,
}

impl<P> SensorBank<P, NoSensor>
where
    P: TemperatureSensor + HumiditySensor,
{
    pub fn primary_only(primary: P) -> Self {
        Self::new(primary, NoSensor, SensorSources::default())
    }
}

impl<P, A> SensorBank<P, A>
where
    P: TemperatureSensor + HumiditySensor,
    A: TemperatureSensor,
{
    pub fn new(primary: P, alternate: A, sources: SensorSources) -> Self {
        info!("Sensor sources: {}", sources);
        Self {
            primary,
            alternate,
            sources,
        }
    }

    pub fn sources(&self) -> SensorSources {
        self.sources
    }

    fn temperature(&mut self) -> Option<f32> {
        let result = match self.sources.temperature {
            TemperatureSource::Primary => self
                .primary
                .read_temperature()
                .map_err(|e| warn!("Temperature read failed: {}", Debug2Format(&e))),
            TemperatureSource::Rtc => self
                .alternate
                .read_temperature()
                .map_err(|e| warn!("RTC temperature read failed: {}", Debug2Format(&e))),
        };
        result.ok()
    }

    fn humidity(&mut self) -> Option<f32> {
        match self.sources.humidity {
            HumiditySource::Primary => self
                .primary
                .read_humidity()
                .map_err(|e| warn!("Humidity read failed: {}", Debug2Format(&e)))
                .ok(),
        }
    }
}

impl<P, A> Sampler for SensorBank<P, A>
where
    P: TemperatureSensor + HumiditySensor,
    A: TemperatureSensor,
{
    fn sample(&mut self) -> SensorReading {
        let reading = SensorReading {
            temperature_c: self.temperature(),
            humidity_pct: self.humidity(),
        };
        debug!("Sampled {}", reading);
        reading
    }
}
