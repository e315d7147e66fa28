//! Time sources: the LSE-driven calendar RTC and the TIM2 monotonic
//!
//! The STM32F4 RTC counts in calendar fields rather than seconds, so every
//! access converts through the core's calendar math.

use core::cell::RefCell;

use critical_section::Mutex;
use defmt::Format;
use embassy_stm32::rtc::{DateTime as RtcDateTime, DayOfWeek, Rtc};
use envlog_core::time::{DateTime, Instant, Weekday};
use hal_abstractions::{RealTimeCounter, Uptime};
use rtic_monotonics::Monotonic;

use crate::Mono;

/// RTC shared between the counter and the backup register store
pub type SharedRtc = Mutex<RefCell<Rtc>>;

/// RTC access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum RtcFault {
    /// Calendar registers unreadable or not yet initialized
    Read,
    /// Calendar write rejected
    Write,
    /// Hardware returned fields that are not a valid date
    Calendar,
}

/// Battery-backed RTC as a Unix seconds counter
pub struct RtcCounter {
    rtc: &'static SharedRtc,
}

impl RtcCounter {
    pub fn new(rtc: &'static SharedRtc) -> Self {
        Self { rtc }
    }
}

impl RealTimeCounter for RtcCounter {
    type Error = RtcFault;

    fn read(&mut self) -> Result<u64, RtcFault> {
        let now = critical_section::with(|cs| self.rtc.borrow_ref(cs).now())
            .map_err(|_| RtcFault::Read)?;
        let dt = DateTime::new(
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
        )
        .ok_or(RtcFault::Calendar)?;
        Ok(dt.to_instant().as_secs())
    }

    fn write(&mut self, unix_secs: u64) -> Result<(), RtcFault> {
        let dt = Instant::from_secs(unix_secs).to_datetime();
        let fields = RtcDateTime::from(
            dt.year,
            dt.month,
            dt.day,
            day_of_week(dt.weekday()),
            dt.hour,
            dt.minute,
            dt.second,
            0,
        )
        .map_err(|_| RtcFault::Calendar)?;

        critical_section::with(|cs| self.rtc.borrow_ref_mut(cs).set_datetime(fields))
            .map_err(|_| RtcFault::Write)
    }
}

fn day_of_week(weekday: Weekday) -> DayOfWeek {
    match weekday {
        Weekday::Sunday => DayOfWeek::Sunday,
        Weekday::Monday => DayOfWeek::Monday,
        Weekday::Tuesday => DayOfWeek::Tuesday,
        Weekday::Wednesday => DayOfWeek::Wednesday,
        Weekday::Thursday => DayOfWeek::Thursday,
        Weekday::Friday => DayOfWeek::Friday,
        Weekday::Saturday => DayOfWeek::Saturday,
    }
}

/// Uptime from the TIM2 monotonic (1 MHz)
pub struct MonoUptime;

impl Uptime for MonoUptime {
    fn uptime_millis(&self) -> u64 {
        micros() / 1_000
    }
}

/// Microseconds since boot, for bit timing
pub fn micros() -> u64 {
    // 1 MHz tick rate
    Mono::now().ticks()
}
