//! Operator console protocol
//!
//! Bytes arrive one at a time from a serial port and are assembled into
//! lines by [`LineBuffer`]. Outside the clock-set flow the only command is
//! `SET`. Inside it, a line holds the local time as
//! `year,month,day,hour,minute,second` where the year is either two digits
//! (2000-relative) or four digits between 2000 and 2099.

use core::fmt;
use core::str::FromStr;

use heapless::{String, Vec};

use crate::time::{days_in_month, DateTime};

/// Longest accepted console line, terminator excluded
pub const LINE_CAP: usize = 32;

/// Clock-set line field
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

const FIELD_COUNT: usize = 6;

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::Hour => "hour",
            Field::Minute => "minute",
            Field::Second => "second",
        }
    }
}

/// Malformed operator input
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Not exactly six comma separated fields
    FieldCount(usize),
    NotANumber(Field),
    OutOfRange(Field),
    /// Year neither 2 nor 4 digits
    YearDigits,
    /// Line longer than [`LINE_CAP`]
    TooLong,
    /// Bytes that are not UTF-8
    Encoding,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected 6 fields, got {}", n),
            Self::NotANumber(field) => write!(f, "{} is not a number", field.name()),
            Self::OutOfRange(field) => write!(f, "{} out of range", field.name()),
            Self::YearDigits => write!(f, "year must have 2 or 4 digits"),
            Self::TooLong => write!(f, "line longer than {} characters", LINE_CAP),
            Self::Encoding => write!(f, "line is not valid text"),
        }
    }
}

impl core::error::Error for InputError {}

/// Assembles bytes into lines
///
/// CR, LF and CRLF all terminate a line; empty lines are swallowed.
/// Backspace and DEL remove the last byte. Input past the capacity is
/// dropped and the whole line is reported as [`InputError::TooLong`] once
/// its terminator arrives.
#[derive(Debug, Default)]
pub struct LineBuffer<const N: usize> {
    bytes: Vec<u8, N>,
    overflow: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            overflow: false,
        }
    }

    /// Feed one byte; returns a result when a line is complete
    pub fn push(&mut self, byte: u8) -> Option<Result<String<N>, InputError>> {
        match byte {
            b'\r' | b'\n' => {
                if self.overflow {
                    self.clear();
                    return Some(Err(InputError::TooLong));
                }
                if self.bytes.is_empty() {
                    return None;
                }
                let bytes = core::mem::take(&mut self.bytes);
                Some(String::from_utf8(bytes).map_err(|_| InputError::Encoding))
            }
            0x08 | 0x7F => {
                self.bytes.pop();
                None
            }
            _ => {
                if self.bytes.push(byte).is_err() {
                    self.overflow = true;
                }
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.overflow = false;
    }
}

/// Console command outside the clock-set flow
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enter the clock-set flow
    Set,
    Unknown,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        if line.trim().eq_ignore_ascii_case("SET") {
            Command::Set
        } else {
            Command::Unknown
        }
    }
}

fn number<T: FromStr>(raw: &str, field: Field) -> Result<T, InputError> {
    // `FromStr` would accept a leading sign
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber(field));
    }
    raw.parse().map_err(|_| InputError::OutOfRange(field))
}

fn ranged(raw: &str, field: Field, min: u8, max: u8) -> Result<u8, InputError> {
    let value: u8 = number(raw, field)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(InputError::OutOfRange(field))
    }
}

fn year(raw: &str) -> Result<u16, InputError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber(Field::Year));
    }
    match raw.len() {
        2 => Ok(2000 + number::<u16>(raw, Field::Year)?),
        4 => {
            let value: u16 = number(raw, Field::Year)?;
            if (2000..=2099).contains(&value) {
                Ok(value)
            } else {
                Err(InputError::OutOfRange(Field::Year))
            }
        }
        _ => Err(InputError::YearDigits),
    }
}

/// Parse `year,month,day,hour,minute,second` into a local calendar time
pub fn parse_clock_line(line: &str) -> Result<DateTime, InputError> {
    let mut raw: [&str; FIELD_COUNT] = [""; FIELD_COUNT];
    let mut count = 0;
    for part in line.trim().split(',') {
        if let Some(slot) = raw.get_mut(count) {
            *slot = part.trim();
        }
        count += 1;
    }
    if count != FIELD_COUNT {
        return Err(InputError::FieldCount(count));
    }

    let year = year(raw[0])?;
    let month = ranged(raw[1], Field::Month, 1, 12)?;
    let day = ranged(raw[2], Field::Day, 1, days_in_month(year, month))?;
    let hour = ranged(raw[3], Field::Hour, 0, 23)?;
    let minute = ranged(raw[4], Field::Minute, 0, 59)?;
    let second = ranged(raw[5], Field::Second, 0, 59)?;

    DateTime::new(year, month, day, hour, minute, second)
        .ok_or(InputError::OutOfRange(Field::Day))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<const N: usize>(
        buf: &mut LineBuffer<N>,
        input: &[u8],
    ) -> std::vec::Vec<Result<String<N>, InputError>> {
        input.iter().filter_map(|&b| buf.push(b)).collect()
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(
            parse_clock_line("24,3,15,9,30,0"),
            Ok(DateTime::new(2024, 3, 15, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_four_digit_year_and_whitespace() {
        assert_eq!(
            parse_clock_line("  2024 , 11, 3 ,1,59 ,59\r"),
            Ok(DateTime::new(2024, 11, 3, 1, 59, 59).unwrap())
        );
        assert_eq!(
            parse_clock_line("2099,12,31,23,59,59"),
            Ok(DateTime::new(2099, 12, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn test_year_rules() {
        assert_eq!(parse_clock_line("1999,1,1,0,0,0"), Err(InputError::OutOfRange(Field::Year)));
        assert_eq!(parse_clock_line("2100,1,1,0,0,0"), Err(InputError::OutOfRange(Field::Year)));
        assert_eq!(parse_clock_line("124,1,1,0,0,0"), Err(InputError::YearDigits));
        assert_eq!(parse_clock_line("4,1,1,0,0,0"), Err(InputError::YearDigits));
        assert_eq!(parse_clock_line("202400,1,1,0,0,0"), Err(InputError::YearDigits));
        assert_eq!(parse_clock_line("y2k,1,1,0,0,0"), Err(InputError::NotANumber(Field::Year)));
    }

    #[test]
    fn test_field_errors() {
        assert_eq!(parse_clock_line("24,3,15,9,30"), Err(InputError::FieldCount(5)));
        assert_eq!(parse_clock_line("24,3,15,9,30,0,0,1"), Err(InputError::FieldCount(8)));
        assert_eq!(parse_clock_line(""), Err(InputError::FieldCount(1)));
        assert_eq!(parse_clock_line("24,x,15,9,30,0"), Err(InputError::NotANumber(Field::Month)));
        assert_eq!(parse_clock_line("24,3,15,-9,30,0"), Err(InputError::NotANumber(Field::Hour)));
        assert_eq!(parse_clock_line("24,3,,9,30,0"), Err(InputError::NotANumber(Field::Day)));
        assert_eq!(parse_clock_line("24,13,15,9,30,0"), Err(InputError::OutOfRange(Field::Month)));
        assert_eq!(parse_clock_line("23,2,29,9,30,0"), Err(InputError::OutOfRange(Field::Day)));
        assert_eq!(parse_clock_line("24,2,29,24,30,0"), Err(InputError::OutOfRange(Field::Hour)));
        assert_eq!(parse_clock_line("24,2,29,9,60,0"), Err(InputError::OutOfRange(Field::Minute)));
        assert_eq!(parse_clock_line("24,2,29,9,30,999"), Err(InputError::OutOfRange(Field::Second)));
    }

    #[test]
    fn test_line_terminators() {
        let mut buf = LineBuffer::<LINE_CAP>::new();
        let lines = feed(&mut buf, b"SET\r\n24,3,15\n\r\nabc\r");
        let lines: std::vec::Vec<_> = lines.iter().map(|l| l.as_ref().unwrap().as_str()).collect();
        assert_eq!(lines, ["SET", "24,3,15", "abc"]);
    }

    #[test]
    fn test_backspace() {
        let mut buf = LineBuffer::<LINE_CAP>::new();
        let lines = feed(&mut buf, b"SEX\x08T\n");
        assert_eq!(lines[0].as_ref().unwrap().as_str(), "SET");
    }

    #[test]
    fn test_overflow_discards_whole_line() {
        let mut buf = LineBuffer::<8>::new();
        let lines = feed(&mut buf, b"0123456789\nSET\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Err(InputError::TooLong));
        assert_eq!(lines[1].as_ref().unwrap().as_str(), "SET");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = LineBuffer::<LINE_CAP>::new();
        assert_eq!(feed(&mut buf, b"\xFF\xFE\n"), [Err(InputError::Encoding)]);
    }

    #[test]
    fn test_command() {
        assert_eq!(Command::parse("SET"), Command::Set);
        assert_eq!(Command::parse(" set "), Command::Set);
        assert_eq!(Command::parse("SETT"), Command::Unknown);
        assert_eq!(Command::parse("help"), Command::Unknown);
    }
}
