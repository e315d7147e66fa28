//! Operator console and fault indicator
//!
//! Both are expressed in terms of the embedded-io and embedded-hal traits so
//! any UART driver or GPIO pin can be handed to the core directly.

use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};

/// Bidirectional byte stream to the operator (usually a UART)
///
/// `ReadReady` lets the main loop poll for commands without blocking.
pub trait Console: Read + Write + ReadReady {}

impl<T: Read + Write + ReadReady> Console for T {}

/// Visible fault signal (usually an LED)
pub trait FaultIndicator: OutputPin {}

impl<T: OutputPin> FaultIndicator for T {}
