//! Hardware abstraction traits for the environmental logger firmware
//!
//! This crate defines the collaborator traits the platform-agnostic core
//! drives. BSPs implement these traits; host tests implement them with
//! in-memory fakes.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod console;
pub mod display;
pub mod rtc;
pub mod sensor;
pub mod storage;

pub use console::{Console, FaultIndicator};
pub use display::CharDisplay;
pub use rtc::{RealTimeCounter, Uptime};
pub use sensor::{HumiditySensor, TemperatureSensor};
pub use storage::{AppendLog, NonVolatileStore};

// Re-exported so BSPs and the core agree on one version of each
pub use embedded_hal;
pub use embedded_io;
