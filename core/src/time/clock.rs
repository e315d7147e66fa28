//! Authoritative UTC clock
//!
//! Same scheme as a Linux CLOCK_REALTIME: a base UTC value captured at a
//! known uptime, advanced by the uptime timer. The base is refreshed from
//! the battery-backed hardware counter every sync interval, so drift of
//! the uptime timer never accumulates past one interval.

use core::fmt;

use hal_abstractions::{RealTimeCounter, Uptime};

use super::{Instant, Timezone};
use crate::fmt::Debug2Format;

/// Hardware re-read interval
pub const DEFAULT_SYNC_INTERVAL_SECS: u32 = 3600;

/// Anything earlier than 2000-01-01 00:00:00 UTC means the counter lost
/// power or was never set
pub const MIN_PLAUSIBLE_UNIX_SECS: u64 = 946_684_800;

/// 2100-01-01 00:00:00 UTC; the console only accepts years up to 2099, so
/// anything at or past this is an erased or corrupted counter
pub const MAX_PLAUSIBLE_UNIX_SECS: u64 = 4_102_444_800;

fn plausible(secs: u64) -> bool {
    (MIN_PLAUSIBLE_UNIX_SECS..MAX_PLAUSIBLE_UNIX_SECS).contains(&secs)
}

/// Clock errors
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError<E> {
    /// Counter read/write failed
    Hardware(E),
    /// Counter returned a value outside 2000..2100 or earlier than a
    /// previous read
    Implausible(Instant),
}

impl<E: fmt::Debug> fmt::Display for ClockError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "RTC hardware error: {:?}", e),
            Self::Implausible(t) => write!(f, "implausible RTC value {}", t.as_secs()),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for ClockError<E> {}

/// UTC value pinned to an uptime reading
#[derive(Debug, Clone, Copy)]
struct Anchor {
    utc: Instant,
    uptime_ms: u64,
}

/// Single owner of "now"
pub struct ClockAuthority<R, U> {
    rtc: R,
    uptime: U,
    anchor: Option<Anchor>,
    last_sync_ms: Option<u64>,
    last_hardware: Option<Instant>,
    sync_interval_secs: u32,
    healthy: bool,
}

impl<R, U> ClockAuthority<R, U>
where
    R: RealTimeCounter,
    U: Uptime,
{
    pub fn new(rtc: R, uptime: U) -> Self {
        Self::with_sync_interval(rtc, uptime, DEFAULT_SYNC_INTERVAL_SECS)
    }

    pub fn with_sync_interval(rtc: R, uptime: U, sync_interval_secs: u32) -> Self {
        Self {
            rtc,
            uptime,
            anchor: None,
            last_sync_ms: None,
            last_hardware: None,
            sync_interval_secs,
            healthy: false,
        }
    }

    /// Current UTC time
    ///
    /// Re-reads the hardware counter first when the sync interval has
    /// elapsed (or on the first call). A failed read leaves the software
    /// time running and marks the clock unhealthy; the next attempt waits
    /// for the following interval.
    pub fn now(&mut self) -> Instant {
        let uptime_ms = self.uptime.uptime_millis();
        let due = match self.last_sync_ms {
            None => true,
            Some(last) => {
                uptime_ms.saturating_sub(last) >= self.sync_interval_secs as u64 * 1000
            }
        };
        if due {
            // Failure is recorded in `healthy` and already logged
            let _ = self.sync();
        }
        self.software_time(uptime_ms)
    }

    /// Re-read the hardware counter and re-anchor the software clock
    pub fn sync(&mut self) -> Result<Instant, ClockError<R::Error>> {
        let uptime_ms = self.uptime.uptime_millis();
        self.last_sync_ms = Some(uptime_ms);

        let result = match self.rtc.read() {
            Ok(secs) => {
                let value = Instant::from_secs(secs);
                let went_back = self.last_hardware.is_some_and(|prev| value < prev);
                if !plausible(secs) || went_back {
                    Err(ClockError::Implausible(value))
                } else {
                    Ok(value)
                }
            }
            Err(e) => Err(ClockError::Hardware(e)),
        };

        match result {
            Ok(utc) => {
                if let Some(anchor) = self.anchor {
                    let soft = Self::advance(anchor, uptime_ms);
                    let drift = utc.as_secs() as i64 - soft.as_secs() as i64;
                    if drift != 0 {
                        debug!("RTC sync corrected software clock by {} s", drift);
                    }
                }
                self.anchor = Some(Anchor { utc, uptime_ms });
                self.last_hardware = Some(utc);
                if !self.healthy {
                    info!("RTC synchronized: {} UTC", utc.as_secs());
                }
                self.healthy = true;
            }
            Err(ref e) => {
                warn!("RTC read failed: {}", Debug2Format(e));
                self.healthy = false;
            }
        }
        result
    }

    /// Set the clock from an operator-entered local time
    ///
    /// The local time is converted to UTC with `tz`, written to the
    /// hardware counter and becomes the new anchor.
    pub fn set_from_local(
        &mut self,
        local: Instant,
        tz: &Timezone,
    ) -> Result<Instant, ClockError<R::Error>> {
        let utc = tz.to_utc(local);
        if !plausible(utc.as_secs()) {
            return Err(ClockError::Implausible(utc));
        }

        self.rtc.write(utc.as_secs()).map_err(|e| {
            error!("RTC write failed: {}", Debug2Format(&e));
            ClockError::Hardware(e)
        })?;

        let uptime_ms = self.uptime.uptime_millis();
        self.anchor = Some(Anchor { utc, uptime_ms });
        self.last_sync_ms = Some(uptime_ms);
        self.last_hardware = Some(utc);
        self.healthy = true;
        info!("Clock set: {} UTC", utc.as_secs());
        Ok(utc)
    }

    /// True once the hardware produced a plausible instant and has not
    /// faulted since
    pub fn hardware_healthy(&self) -> bool {
        self.healthy
    }

    pub fn sync_interval_secs(&self) -> u32 {
        self.sync_interval_secs
    }

    /// Milliseconds since boot, for sub-second timing such as blinking
    pub fn uptime_millis(&self) -> u64 {
        self.uptime.uptime_millis()
    }

    fn software_time(&self, uptime_ms: u64) -> Instant {
        match self.anchor {
            Some(anchor) => Self::advance(anchor, uptime_ms),
            None => Instant::EPOCH,
        }
    }

    fn advance(anchor: Anchor, uptime_ms: u64) -> Instant {
        let elapsed_secs = uptime_ms.saturating_sub(anchor.uptime_ms) / 1000;
        Instant::from_secs(anchor.utc.as_secs().saturating_add(elapsed_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRtc, FakeUptime};
    use crate::time::{DateTime, US_EASTERN};

    const T0: u64 = 1_710_513_000; // 2024-03-15 14:30:00 UTC

    #[test]
    fn test_first_call_reads_hardware() {
        let rtc = FakeRtc::new(Some(T0));
        let uptime = FakeUptime::new(5_000);
        let mut clock = ClockAuthority::new(rtc.clone(), uptime.clone());

        assert!(!clock.hardware_healthy());
        assert_eq!(clock.now().as_secs(), T0);
        assert!(clock.hardware_healthy());
        assert_eq!(rtc.reads(), 1);
    }

    #[test]
    fn test_software_time_between_syncs() {
        let rtc = FakeRtc::new(Some(T0));
        let uptime = FakeUptime::new(0);
        let mut clock = ClockAuthority::new(rtc.clone(), uptime.clone());
        clock.now();

        // Hardware keeps its value; software clock advances on its own
        uptime.advance_ms(1_999);
        assert_eq!(clock.now().as_secs(), T0 + 1);
        uptime.advance_ms(60_001);
        assert_eq!(clock.now().as_secs(), T0 + 62);
        assert_eq!(rtc.reads(), 1);
    }

    #[test]
    fn test_resync_after_interval() {
        let rtc = FakeRtc::new(Some(T0));
        let uptime = FakeUptime::new(0);
        let mut clock = ClockAuthority::with_sync_interval(rtc.clone(), uptime.clone(), 60);
        clock.now();

        // Uptime timer ran slow: hardware says 65 s passed, uptime says 60
        rtc.set(Some(T0 + 65));
        uptime.advance_ms(60_000);
        assert_eq!(clock.now().as_secs(), T0 + 65);
        assert_eq!(rtc.reads(), 2);
    }

    #[test]
    fn test_fault_marks_unhealthy_and_keeps_software_time() {
        let rtc = FakeRtc::new(Some(T0));
        let uptime = FakeUptime::new(0);
        let mut clock = ClockAuthority::with_sync_interval(rtc.clone(), uptime.clone(), 10);
        clock.now();

        rtc.set(None);
        uptime.advance_ms(10_000);
        assert_eq!(clock.now().as_secs(), T0 + 10);
        assert!(!clock.hardware_healthy());
    }

    #[test]
    fn test_implausible_values_are_rejected() {
        let rtc = FakeRtc::new(Some(0));
        let mut clock = ClockAuthority::new(rtc.clone(), FakeUptime::new(0));
        assert_eq!(clock.sync(), Err(ClockError::Implausible(Instant::EPOCH)));
        assert!(!clock.hardware_healthy());

        rtc.set(Some(T0));
        assert!(clock.sync().is_ok());
        rtc.set(Some(T0 - 1));
        assert_eq!(
            clock.sync(),
            Err(ClockError::Implausible(Instant::from_secs(T0 - 1)))
        );
        assert!(!clock.hardware_healthy());
    }

    #[test]
    fn test_values_past_2099_are_rejected() {
        let rtc = FakeRtc::new(Some(u64::MAX));
        let mut clock = ClockAuthority::new(rtc.clone(), FakeUptime::new(0));
        assert_eq!(
            clock.sync(),
            Err(ClockError::Implausible(Instant::from_secs(u64::MAX)))
        );
        assert!(!clock.hardware_healthy());

        rtc.set(Some(MAX_PLAUSIBLE_UNIX_SECS));
        assert!(clock.sync().is_err());
        rtc.set(Some(MAX_PLAUSIBLE_UNIX_SECS - 1));
        assert!(clock.sync().is_ok());
        assert!(clock.hardware_healthy());
    }

    #[test]
    fn test_set_from_local_rejects_out_of_range() {
        let rtc = FakeRtc::new(Some(T0));
        let mut clock = ClockAuthority::new(rtc.clone(), FakeUptime::new(0));
        let tz = Timezone::new(US_EASTERN);

        // 2100-01-01 05:00 local is past the upper bound in UTC
        let local = Instant::from_secs(MAX_PLAUSIBLE_UNIX_SECS);
        assert!(matches!(
            clock.set_from_local(local, &tz),
            Err(ClockError::Implausible(_))
        ));
        assert_eq!(rtc.value(), Some(T0));
    }

    #[test]
    fn test_set_from_local_writes_utc() {
        let rtc = FakeRtc::new(None);
        let uptime = FakeUptime::new(42_000);
        let mut clock = ClockAuthority::new(rtc.clone(), uptime.clone());
        let tz = Timezone::new(US_EASTERN);

        clock.now();
        assert!(!clock.hardware_healthy());

        // 2024-03-15 09:30:00 EDT
        let local = DateTime::new(2024, 3, 15, 9, 30, 0).unwrap().to_instant();
        let utc = clock.set_from_local(local, &tz).unwrap();
        assert_eq!(utc, DateTime::new(2024, 3, 15, 13, 30, 0).unwrap().to_instant());
        assert_eq!(rtc.value(), Some(utc.as_secs()));
        assert!(clock.hardware_healthy());

        uptime.advance_ms(3_000);
        assert_eq!(clock.now().as_secs(), utc.as_secs() + 3);
    }

    #[test]
    fn test_set_from_local_reports_write_fault() {
        let rtc = FakeRtc::new(Some(T0));
        rtc.fail_writes(true);
        let mut clock = ClockAuthority::new(rtc.clone(), FakeUptime::new(0));
        let tz = Timezone::new(US_EASTERN);

        let local = DateTime::new(2024, 3, 15, 9, 30, 0).unwrap().to_instant();
        assert!(matches!(
            clock.set_from_local(local, &tz),
            Err(ClockError::Hardware(_))
        ));
        assert_eq!(rtc.value(), Some(T0));
    }
}
