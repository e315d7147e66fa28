//! Bit-banged DHT22 (AM2302) temperature and humidity sensor
//!
//! One transaction yields both quantities, so the last result is kept for
//! the sensor's minimum sampling period and shared by the temperature and
//! humidity reads of one sample.

use defmt::Format;
use embedded_hal::digital::{InputPin, OutputPin};
use hal_abstractions::{HumiditySensor, TemperatureSensor};

/// Minimum time between transactions
const MIN_INTERVAL_US: u64 = 2_000_000;
const WAKE_LOW_US: u64 = 3_000;
const RELEASE_US: u64 = 25;
const HANDSHAKE_TIMEOUT_US: u64 = 85;
const BIT_LOW_TIMEOUT_US: u64 = 56;
const BIT_HIGH_TIMEOUT_US: u64 = 75;
/// High pulses longer than this are ones
const ONE_THRESHOLD_US: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum Dht22Error {
    /// Sensor did not answer or a bit took too long
    Timeout,
    Checksum,
    Pin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Measurement {
    temperature_c: f32,
    humidity_pct: f32,
}

/// Sensor on an open-drain data line with an external pull-up
pub struct Dht22<P> {
    pin: P,
    now_us: fn() -> u64,
    last: Option<(u64, Result<Measurement, Dht22Error>)>,
}

impl<P> Dht22<P>
where
    P: InputPin + OutputPin,
{
    pub fn new(pin: P, now_us: fn() -> u64) -> Self {
        Self {
            pin,
            now_us,
            last: None,
        }
    }

    fn measure(&mut self) -> Result<Measurement, Dht22Error> {
        let now = (self.now_us)();
        if let Some((at, result)) = self.last {
            if now.wrapping_sub(at) < MIN_INTERVAL_US {
                return result;
            }
        }

        let result = self.transaction();
        if let Err(e) = result {
            defmt::debug!("DHT22 transaction failed: {}", e);
        }
        self.last = Some(((self.now_us)(), result));
        result
    }

    fn transaction(&mut self) -> Result<Measurement, Dht22Error> {
        // Start signal, then release the line to the sensor
        self.pin.set_low().map_err(|_| Dht22Error::Pin)?;
        self.wait_us(WAKE_LOW_US);
        self.pin.set_high().map_err(|_| Dht22Error::Pin)?;
        self.wait_us(RELEASE_US);

        // Response: 80 us low, 80 us high
        self.level_duration(false, HANDSHAKE_TIMEOUT_US)?;
        self.level_duration(true, HANDSHAKE_TIMEOUT_US)?;

        let mut data = [0u8; 5];
        for bit in 0..40 {
            self.level_duration(false, BIT_LOW_TIMEOUT_US)?;
            let high = self.level_duration(true, BIT_HIGH_TIMEOUT_US)?;
            if high > ONE_THRESHOLD_US {
                data[bit / 8] |= 0x80 >> (bit % 8);
            }
        }

        decode(&data)
    }

    fn wait_us(&self, us: u64) {
        let start = (self.now_us)();
        while (self.now_us)().wrapping_sub(start) < us {}
    }

    /// Time the line stays at `high`, failing after `max_us`
    fn level_duration(&mut self, high: bool, max_us: u64) -> Result<u64, Dht22Error> {
        let start = (self.now_us)();
        loop {
            let level = self.pin.is_high().map_err(|_| Dht22Error::Pin)?;
            let elapsed = (self.now_us)().wrapping_sub(start);
            if level != high {
                return Ok(elapsed);
            }
            if elapsed > max_us {
                return Err(Dht22Error::Timeout);
            }
        }
    }
}

fn decode(data: &[u8; 5]) -> Result<Measurement, Dht22Error> {
    let sum = data[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != data[4] {
        return Err(Dht22Error::Checksum);
    }

    let humidity = u16::from_be_bytes([data[0], data[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([data[2] & 0x7F, data[3]]) as f32 / 10.0;
    let temperature = if data[2] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(Measurement {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}

impl<P: InputPin + OutputPin> TemperatureSensor for Dht22<P> {
    type Error = Dht22Error;

    fn read_temperature(&mut self) -> Result<f32, Dht22Error> {
        self.measure().map(|m| m.temperature_c)
    }
}

impl<P: InputPin + OutputPin> HumiditySensor for Dht22<P> {
    type Error = Dht22Error;

    fn read_humidity(&mut self) -> Result<f32, Dht22Error> {
        self.measure().map(|m| m.humidity_pct)
    }
}
