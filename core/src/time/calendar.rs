//! Calendar date/time conversions using O(1) algorithms
//!
//! Implements Howard Hinnant's civil_from_days and days_from_civil algorithms.
//! Reference: http://howardhinnant.github.io/date_algorithms.html
//!
//! These algorithms are used in C++20's `<chrono>` library and provide:
//! - O(1) time complexity (no year iteration)
//! - Correct handling of leap years
//! - Valid for all dates in the proleptic Gregorian calendar

use super::Instant;

const SECONDS_PER_DAY: u64 = 86_400;

/// Day of the week, numbered from Sunday = 1
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    /// Decode from the 1-based numbering used in the persisted rule format
    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::Sunday,
            2 => Self::Monday,
            3 => Self::Tuesday,
            4 => Self::Wednesday,
            5 => Self::Thursday,
            6 => Self::Friday,
            7 => Self::Saturday,
            _ => return None,
        })
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Weekday of a day counted from 1970-01-01 (a Thursday)
    pub(crate) fn from_days(days_since_epoch: i32) -> Self {
        let idx = (days_since_epoch + 4).rem_euclid(7) as u8;
        Self::from_number(idx + 1).unwrap_or(Self::Sunday)
    }
}

/// Broken-down calendar date and time of day
///
/// Carries no zone information: whether it is UTC or local depends on the
/// `Instant` it was derived from.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Build a validated date/time; `None` if any field is out of range
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        if year < 1970
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return None;
        }
        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Break an instant down into calendar fields
    pub fn from_instant(instant: Instant) -> Self {
        let unix_secs = instant.as_secs();
        let days_since_epoch = (unix_secs / SECONDS_PER_DAY) as i32;
        let secs_today = unix_secs % SECONDS_PER_DAY;

        let (year, month, day) = civil_from_days(days_since_epoch);
        Self {
            year,
            month,
            day,
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }

    /// Seconds since the epoch for these calendar fields
    pub fn to_instant(&self) -> Instant {
        let days_since_epoch = days_from_civil(self.year, self.month, self.day);
        Instant::from_secs(
            (days_since_epoch.max(0) as u64) * SECONDS_PER_DAY
                + (self.hour as u64) * 3600
                + (self.minute as u64) * 60
                + (self.second as u64),
        )
    }

    pub fn weekday(&self) -> Weekday {
        Weekday::from_days(days_from_civil(self.year, self.month, self.day))
    }
}

/// Check if year is a leap year (Gregorian calendar)
///
/// - Divisible by 4: leap year
/// - EXCEPT divisible by 100: not a leap year
/// - EXCEPT divisible by 400: leap year
pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`; 0 for an invalid month
pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Convert days since Unix epoch to civil date (year, month, day)
///
/// Howard Hinnant's civil_from_days algorithm.
pub(crate) fn civil_from_days(days_since_epoch: i32) -> (u16, u8, u8) {
    // Shift epoch from 1970-01-01 to 0000-03-01 (March 1, year 0)
    // This makes the year start on March 1, placing leap day at end of year
    let z = days_since_epoch + 719468;

    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = (yoe as i32) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11], 0 = March
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;

    // January and February belong to the next civil year
    let year = if m <= 2 { y + 1 } else { y };

    (year as u16, m, d)
}

/// Convert civil date (year, month, day) to days since Unix epoch
///
/// Howard Hinnant's days_from_civil algorithm.
pub(crate) fn days_from_civil(year: u16, month: u8, day: u8) -> i32 {
    let y = year as i32;
    let m = month as i32;
    let d = day as i32;

    // March = month 0, February = month 11
    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32; // year of era [0, 399]
    let doy = (153 * (m as u32) + 2) / 5 + (d as u32) - 1; // day of year [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era [0, 146096]

    era * 146097 + (doe as i32) - 719468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000)); // Divisible by 400
        assert!(is_leap_year(2024)); // Divisible by 4
        assert!(!is_leap_year(1900)); // Divisible by 100, not 400
        assert!(!is_leap_year(2023)); // Not divisible by 4
        assert!(!is_leap_year(2100)); // Divisible by 100, not 400
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[test]
    fn test_unix_epoch() {
        let dt = DateTime::from_instant(Instant::from_secs(0));
        assert_eq!(dt, DateTime::new(1970, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(dt.weekday(), Weekday::Thursday);
    }

    #[test]
    fn test_round_trip_conversion() {
        let test_dates = [
            0u64,       // 1970-01-01 00:00:00
            946684800,  // 2000-01-01 00:00:00
            1609459200, // 2021-01-01 00:00:00
            1704067200, // 2024-01-01 00:00:00
            2147483647, // 2038-01-19 03:14:07 (32-bit Unix time limit)
            4102444800, // 2100-01-01 00:00:00
        ];

        for &unix_secs in &test_dates {
            let dt = DateTime::from_instant(Instant::from_secs(unix_secs));
            assert_eq!(
                unix_secs,
                dt.to_instant().as_secs(),
                "Round trip failed for timestamp {}",
                unix_secs
            );
        }
    }

    #[test]
    fn test_leap_day_2024() {
        let leap_day = DateTime::new(2024, 2, 29, 0, 0, 0).unwrap();
        let dt = DateTime::from_instant(leap_day.to_instant());
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
        assert_eq!(dt.weekday(), Weekday::Thursday);
    }

    #[test]
    fn test_end_of_century() {
        let dt = DateTime::new(1999, 12, 31, 23, 59, 59).unwrap();
        let converted = DateTime::from_instant(dt.to_instant());
        assert_eq!(converted, dt);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        assert!(DateTime::new(2023, 2, 29, 0, 0, 0).is_none());
        assert!(DateTime::new(2024, 0, 1, 0, 0, 0).is_none());
        assert!(DateTime::new(2024, 1, 1, 24, 0, 0).is_none());
        assert!(DateTime::new(2024, 1, 1, 0, 60, 0).is_none());
        assert!(DateTime::new(1969, 12, 31, 0, 0, 0).is_none());
    }

    #[test]
    fn test_weekdays() {
        // 2024-03-10 was the second Sunday of March
        assert_eq!(
            DateTime::new(2024, 3, 10, 0, 0, 0).unwrap().weekday(),
            Weekday::Sunday
        );
        assert_eq!(
            DateTime::new(2024, 11, 3, 0, 0, 0).unwrap().weekday(),
            Weekday::Sunday
        );
        assert_eq!(
            DateTime::new(2024, 3, 15, 0, 0, 0).unwrap().weekday(),
            Weekday::Friday
        );
    }
}
