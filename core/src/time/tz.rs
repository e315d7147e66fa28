//! UTC <-> local conversion with automatic daylight-saving transitions
//!
//! A zone is described by two recurrence rules: the one that starts
//! daylight time and the one that returns to standard time. Each rule names
//! an ordinal weekday of a month and a local hour. Daylight start is given
//! in standard local time, standard start in daylight local time, which is
//! how civil DST rules are published ("second Sunday of March, 02:00").

use core::fmt;

use super::calendar::days_from_civil;
use super::{Instant, Weekday};

/// Maximum abbreviation length ("AEDT", "CEST", "+0330" ...)
pub const ABBREV_CAP: usize = 5;

/// Largest accepted UTC offset, in minutes
const MAX_OFFSET_MINUTES: i16 = 14 * 60;

/// Reference year used to check a rule pair for coincident transitions
const VALIDATION_YEAR: u16 = 2024;

/// Ordinal week of the month a rule fires in
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Week {
    /// Last occurrence of the weekday in the month
    Last = 0,
    First = 1,
    Second = 2,
    Third = 3,
    Fourth = 4,
}

impl Week {
    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            0 => Self::Last,
            1 => Self::First,
            2 => Self::Second,
            3 => Self::Third,
            4 => Self::Fourth,
            _ => return None,
        })
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Month {
    January = 1,
    February = 2,
    March = 3,
    April = 4,
    May = 5,
    June = 6,
    July = 7,
    August = 8,
    September = 9,
    October = 10,
    November = 11,
    December = 12,
}

impl Month {
    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::January,
            2 => Self::February,
            3 => Self::March,
            4 => Self::April,
            5 => Self::May,
            6 => Self::June,
            7 => Self::July,
            8 => Self::August,
            9 => Self::September,
            10 => Self::October,
            11 => Self::November,
            12 => Self::December,
            _ => return None,
        })
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Zone abbreviation stored inline (no allocation, const-constructible)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Abbrev {
    bytes: [u8; ABBREV_CAP],
    len: u8,
}

impl Abbrev {
    /// Build from a literal; fails to compile when used in a const with an
    /// abbreviation that is too long or not printable ASCII
    pub const fn new(s: &str) -> Self {
        let src = s.as_bytes();
        assert!(src.len() <= ABBREV_CAP, "zone abbreviation too long");
        let mut bytes = [0u8; ABBREV_CAP];
        let mut i = 0;
        while i < src.len() {
            assert!(is_abbrev_byte(src[i]), "zone abbreviation must be ASCII");
            bytes[i] = src[i];
            i += 1;
        }
        Self {
            bytes,
            len: src.len() as u8,
        }
    }

    /// Build from raw bytes; `None` if too long or not printable ASCII
    pub fn from_bytes(src: &[u8]) -> Option<Self> {
        if src.len() > ABBREV_CAP || !src.iter().all(|&b| is_abbrev_byte(b)) {
            return None;
        }
        let mut bytes = [0u8; ABBREV_CAP];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self {
            bytes,
            len: src.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

const fn is_abbrev_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'-'
}

impl fmt::Debug for Abbrev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Abbrev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Abbrev {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Annual recurrence describing when an offset takes effect
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeChangeRule {
    pub abbrev: Abbrev,
    pub week: Week,
    pub dow: Weekday,
    pub month: Month,
    /// Local hour of the change (0-23), in the offset being left
    pub hour: u8,
    /// Offset from UTC in minutes while this rule is in force
    pub offset_minutes: i16,
}

impl TimeChangeRule {
    pub const fn new(
        abbrev: &str,
        week: Week,
        dow: Weekday,
        month: Month,
        hour: u8,
        offset_minutes: i16,
    ) -> Self {
        Self {
            abbrev: Abbrev::new(abbrev),
            week,
            dow,
            month,
            hour,
            offset_minutes,
        }
    }

    fn offset_secs(&self) -> i64 {
        self.offset_minutes as i64 * 60
    }

    /// Local seconds since the epoch at which this rule fires in `year`
    fn local_transition(&self, year: u16) -> i64 {
        // For "last" rules, start from the first day of the following month
        // and step back a week
        let (y, m) = match self.week {
            Week::Last if self.month == Month::December => (year + 1, 1),
            Week::Last => (year, self.month.number() + 1),
            _ => (year, self.month.number()),
        };

        let first = days_from_civil(y, m, 1);
        let first_dow = Weekday::from_days(first).number() as i32;
        let mut day = first + (self.dow.number() as i32 - first_dow + 7) % 7;
        match self.week {
            Week::Last => day -= 7,
            week => day += 7 * (week.number() as i32 - 1),
        }

        day as i64 * 86_400 + self.hour as i64 * 3600
    }
}

/// Rule pair errors
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TzError {
    /// Offset beyond ±14 hours
    OffsetOutOfRange,
    /// Transition hour above 23
    HourOutOfRange,
    /// Both rules fire at the same instant, so no offset is unambiguous
    CoincidentTransitions,
}

impl fmt::Display for TzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffsetOutOfRange => write!(f, "UTC offset out of range"),
            Self::HourOutOfRange => write!(f, "transition hour out of range"),
            Self::CoincidentTransitions => write!(f, "daylight and standard rules coincide"),
        }
    }
}

impl core::error::Error for TzError {}

/// Daylight and standard rules of one zone
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulePair {
    daylight: TimeChangeRule,
    standard: TimeChangeRule,
}

/// US Eastern: EDT from the second Sunday of March, EST from the first
/// Sunday of November, both at 02:00 local
pub const US_EASTERN: RulePair = RulePair {
    daylight: TimeChangeRule::new("EDT", Week::Second, Weekday::Sunday, Month::March, 2, -240),
    standard: TimeChangeRule::new("EST", Week::First, Weekday::Sunday, Month::November, 2, -300),
};

impl RulePair {
    /// Validate and pair the rules
    ///
    /// Rules with equal offsets describe a zone without DST and are
    /// accepted whatever their dates.
    pub fn new(daylight: TimeChangeRule, standard: TimeChangeRule) -> Result<Self, TzError> {
        for rule in [&daylight, &standard] {
            if rule.offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES as u16 {
                return Err(TzError::OffsetOutOfRange);
            }
            if rule.hour > 23 {
                return Err(TzError::HourOutOfRange);
            }
        }

        let pair = Self { daylight, standard };
        if pair.observes_dst() {
            let (dst_start, std_start) = pair.transitions_utc(VALIDATION_YEAR);
            if dst_start == std_start {
                return Err(TzError::CoincidentTransitions);
            }
        }
        Ok(pair)
    }

    pub fn daylight(&self) -> &TimeChangeRule {
        &self.daylight
    }

    pub fn standard(&self) -> &TimeChangeRule {
        &self.standard
    }

    pub fn observes_dst(&self) -> bool {
        self.daylight.offset_minutes != self.standard.offset_minutes
    }

    /// UTC seconds of (daylight start, standard start) in `year`
    fn transitions_utc(&self, year: u16) -> (i64, i64) {
        let dst_start = self.daylight.local_transition(year) - self.standard.offset_secs();
        let std_start = self.standard.local_transition(year) - self.daylight.offset_secs();
        (dst_start, std_start)
    }
}

/// Stateless converter for one rule pair
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone {
    rules: RulePair,
}

impl Timezone {
    pub const fn new(rules: RulePair) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RulePair {
        &self.rules
    }

    /// Whether daylight time is in force at `utc`
    pub fn is_daylight(&self, utc: Instant) -> bool {
        if !self.rules.observes_dst() {
            return false;
        }

        // The latest transition at or before `utc` decides. Neighbouring
        // years are included because a transition near New Year can fall in
        // a different UTC year than its local one.
        let year = utc.to_datetime().year;
        let t = utc.as_secs() as i64;
        let mut latest: Option<(i64, bool)> = None;
        for y in [year.saturating_sub(1), year, year.saturating_add(1)] {
            let (dst_start, std_start) = self.rules.transitions_utc(y);
            for (at, daylight) in [(dst_start, true), (std_start, false)] {
                if at <= t && latest.map_or(true, |(prev, _)| at > prev) {
                    latest = Some((at, daylight));
                }
            }
        }
        latest.is_some_and(|(_, daylight)| daylight)
    }

    /// Rule in force at `utc`
    pub fn active_rule(&self, utc: Instant) -> &TimeChangeRule {
        if self.is_daylight(utc) {
            &self.rules.daylight
        } else {
            &self.rules.standard
        }
    }

    /// Convert UTC to local time, returning the rule used so callers can
    /// show its abbreviation
    pub fn to_local(&self, utc: Instant) -> (Instant, &TimeChangeRule) {
        let rule = self.active_rule(utc);
        (utc.offset_by(rule.offset_secs()), rule)
    }

    /// Convert local time to UTC
    ///
    /// Both candidates (local read as daylight, local read as standard)
    /// are checked against the rule they assume. In the repeated hour both
    /// are consistent and in the skipped hour neither is; both cases
    /// resolve to the standard reading.
    pub fn to_utc(&self, local: Instant) -> Instant {
        let as_standard = local.offset_by(-self.rules.standard.offset_secs());
        if !self.rules.observes_dst() {
            return as_standard;
        }

        let as_daylight = local.offset_by(-self.rules.daylight.offset_secs());
        let daylight_consistent = self.is_daylight(as_daylight);
        let standard_consistent = !self.is_daylight(as_standard);

        if daylight_consistent && !standard_consistent {
            as_daylight
        } else {
            as_standard
        }
    }
}
