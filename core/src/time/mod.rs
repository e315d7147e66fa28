//! Civil-time management
//!
//! ## Architecture
//! - [`ClockAuthority`] owns the single authoritative UTC [`Instant`]
//! - The battery-backed hardware counter is re-read every sync interval
//!   (default one hour); between reads the instant is advanced from the
//!   uptime timer
//! - [`Timezone`] converts between UTC and local time using a standard /
//!   daylight [`RulePair`], including automatic DST transitions
//! - Local times are always derived, never stored as ground truth
//!
//! ## Limitations
//! - Instants before 1970-01-01 are not representable
//! - No leap seconds
//! - One compiled-in zone; the rule pair is persisted, not a zone database

mod calendar;
mod clock;
mod tz;

pub use calendar::{days_in_month, is_leap_year, DateTime, Weekday};
pub use clock::{
    ClockAuthority, ClockError, DEFAULT_SYNC_INTERVAL_SECS, MAX_PLAUSIBLE_UNIX_SECS,
    MIN_PLAUSIBLE_UNIX_SECS,
};
pub use tz::{Abbrev, Month, RulePair, TimeChangeRule, Timezone, TzError, Week, US_EASTERN};

/// Absolute point in time: seconds since 1970-01-01 00:00:00
///
/// Interpreted as UTC everywhere unless a variable is explicitly named
/// `local`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    pub const EPOCH: Self = Self(0);

    pub const fn from_secs(unix_secs: u64) -> Self {
        Self(unix_secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Shift by a signed number of seconds, clamping at the epoch
    pub fn offset_by(self, secs: i64) -> Self {
        Self(self.0.saturating_add_signed(secs))
    }

    /// Calendar fields of this instant
    pub fn to_datetime(self) -> DateTime {
        DateTime::from_instant(self)
    }
}

impl From<DateTime> for Instant {
    fn from(dt: DateTime) -> Self {
        dt.to_instant()
    }
}
