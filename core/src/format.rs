//! Fixed-form text for display, console and storage
//!
//! Every field has a bounded width so it fits a stack buffer. Sensor values
//! that are absent, not finite or outside the physically plausible range of
//! the sensor render as [`PLACEHOLDER`], never as a number.

use core::fmt::{self, Write};

use heapless::String;

use crate::sensor::SensorReading;
use crate::time::{DateTime, Instant, TimeChangeRule};

/// Rendered in place of a missing or invalid reading
pub const PLACEHOLDER: &str = "**";

/// Plausible temperature range, degrees Celsius
pub const TEMPERATURE_RANGE: (f32, f32) = (-40.0, 85.0);

/// Plausible relative humidity range, percent
pub const HUMIDITY_RANGE: (f32, f32) = (0.0, 100.0);

/// `YYYY-MM-DD`
pub type DateField = String<10>;
/// `HH:MM:SS`
pub type TimeField = String<8>;
/// One decimal or placeholder, e.g. `-12.5`
pub type ValueField = String<6>;
/// `YYYY-MM-DDTHH:MM:SSZ,TEMP,HUMID\n`
pub type LogRecord = String<40>;
/// `YYYY-MM-DD HH:MM:SS ZZZ, TEMP, HUMID`
pub type StatusLine = String<48>;

fn render<const N: usize>(args: fmt::Arguments<'_>) -> String<N> {
    let mut out = String::new();
    // Capacities cover every value the callers pass
    let _ = out.write_fmt(args);
    out
}

pub fn date(dt: &DateTime) -> DateField {
    render(format_args!("{:04}-{:02}-{:02}", dt.year, dt.month, dt.day))
}

pub fn time(dt: &DateTime) -> TimeField {
    render(format_args!("{:02}:{:02}:{:02}", dt.hour, dt.minute, dt.second))
}

fn plausible(value: Option<f32>, (min, max): (f32, f32)) -> Option<f32> {
    // NaN fails the range check as well
    value.filter(|v| (min..=max).contains(v))
}

/// Temperature if the reading is usable
pub fn valid_temperature(value: Option<f32>) -> Option<f32> {
    plausible(value, TEMPERATURE_RANGE)
}

/// Humidity if the reading is usable
pub fn valid_humidity(value: Option<f32>) -> Option<f32> {
    plausible(value, HUMIDITY_RANGE)
}

fn value(v: Option<f32>) -> ValueField {
    match v {
        Some(v) => render(format_args!("{:.1}", v)),
        None => render(format_args!("{}", PLACEHOLDER)),
    }
}

pub fn temperature(v: Option<f32>) -> ValueField {
    value(valid_temperature(v))
}

pub fn humidity(v: Option<f32>) -> ValueField {
    value(valid_humidity(v))
}

/// Storage record, always UTC
pub fn log_record(utc: Instant, reading: &SensorReading) -> LogRecord {
    let dt = utc.to_datetime();
    render(format_args!(
        "{}T{}Z,{},{}\n",
        date(&dt),
        time(&dt),
        temperature(reading.temperature_c),
        humidity(reading.humidity_pct),
    ))
}

/// Console line in local time
pub fn status_line(local: Instant, rule: &TimeChangeRule, reading: &SensorReading) -> StatusLine {
    let dt = local.to_datetime();
    render(format_args!(
        "{} {} {}, {}, {}",
        date(&dt),
        time(&dt),
        rule.abbrev,
        temperature(reading.temperature_c),
        humidity(reading.humidity_pct),
    ))
}
