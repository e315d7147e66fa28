//! Time sources: the battery-backed real-time counter and the uptime timer

use core::fmt::Debug;

/// Battery-backed hardware real-time counter
///
/// Values are seconds since 1970-01-01 00:00:00 UTC. The counter keeps
/// running while the main supply is off, so it is the authority the
/// software clock re-synchronizes from.
pub trait RealTimeCounter {
    /// Hardware fault (bus error, oscillator stopped, ...)
    type Error: Debug;

    /// Read the current counter value
    fn read(&mut self) -> Result<u64, Self::Error>;

    /// Overwrite the counter value
    fn write(&mut self, unix_secs: u64) -> Result<(), Self::Error>;
}

/// Monotonic time since boot
///
/// Used to advance the software clock between hardware reads. Must never
/// go backwards while the device is powered.
pub trait Uptime {
    /// Milliseconds elapsed since boot
    fn uptime_millis(&self) -> u64;
}
