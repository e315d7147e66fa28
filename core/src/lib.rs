//! Platform-agnostic core logic for the environmental logger firmware
//!
//! This crate contains the logic shared by every board: civil time (UTC
//! clock authority, calendar, DST-aware timezone conversion), the persisted
//! rule pair, the sampling scheduler, text formatting, the operator console
//! protocol, display layout and the station control loop. It has NO
//! hardware dependencies; boards implement the `hal-abstractions` traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod config;
pub mod console;
pub mod display;
pub mod format;
pub mod persist;
pub mod schedule;
pub mod sensor;
pub mod station;
pub mod time;

#[cfg(test)]
mod testing;

pub use config::StationConfig;
pub use station::{Parts, Station, StationError, Step};
