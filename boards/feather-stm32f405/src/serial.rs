//! UART adapters: the operator console and the OpenLog sample logger
//!
//! The console is polled between ticks, so reads go through the
//! non-blocking receive path with one byte of lookahead for `read_ready`.

use core::fmt;

use defmt::{warn, Format};
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::{self, UartRx, UartTx};
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use hal_abstractions::AppendLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SerialError {
    Uart(usart::Error),
    /// Port failed to initialize; nothing is connected
    Unavailable,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uart(e) => write!(f, "UART error: {:?}", e),
            Self::Unavailable => write!(f, "UART unavailable"),
        }
    }
}

impl core::error::Error for SerialError {}

impl embedded_io::Error for SerialError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Uart(_) => ErrorKind::Other,
            Self::Unavailable => ErrorKind::NotConnected,
        }
    }
}

pub type ConsolePort = (UartTx<'static, Blocking>, UartRx<'static, Blocking>);

/// Operator console on a full-duplex UART
///
/// Without a port the console reads as closed and discards output, so the
/// station runs on with its persisted settings.
pub struct ConsoleUart {
    port: Option<ConsolePort>,
    pending: Option<u8>,
}

impl ConsoleUart {
    pub fn new(port: Option<ConsolePort>) -> Self {
        Self {
            port,
            pending: None,
        }
    }

    /// Next received byte, if any
    fn poll_byte(&mut self) -> Option<u8> {
        if let Some(b) = self.pending.take() {
            return Some(b);
        }
        let (_, rx) = self.port.as_mut()?;
        match rx.nb_read() {
            Ok(b) => Some(b),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(e)) => {
                // Overrun or framing error; the line parser copes with the gap
                warn!("Console receive error: {}", e);
                None
            }
        }
    }
}

impl ErrorType for ConsoleUart {
    type Error = SerialError;
}

impl Read for ConsoleUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        if buf.is_empty() || self.port.is_none() {
            return Ok(0);
        }

        // Block for the first byte, then take what is already waiting
        buf[0] = loop {
            if let Some(b) = self.poll_byte() {
                break b;
            }
        };
        let mut n = 1;
        while n < buf.len() {
            match self.poll_byte() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for ConsoleUart {
    fn read_ready(&mut self) -> Result<bool, SerialError> {
        if self.pending.is_none() {
            self.pending = self.poll_byte();
        }
        Ok(self.pending.is_some())
    }
}

impl Write for ConsoleUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, SerialError> {
        if let Some((tx, _)) = self.port.as_mut() {
            tx.blocking_write(buf).map_err(SerialError::Uart)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        match self.port.as_mut() {
            Some((tx, _)) => tx.blocking_flush().map_err(SerialError::Uart),
            None => Ok(()),
        }
    }
}

/// SparkFun OpenLog in its default append-to-file mode
///
/// Everything received over the UART lands in the current log file, so a
/// record is just its bytes.
///
/// A missing port fails every append, which the station reports as a
/// storage fault.
pub struct OpenLog {
    tx: Option<UartTx<'static, Blocking>>,
}

impl OpenLog {
    pub fn new(tx: Option<UartTx<'static, Blocking>>) -> Self {
        Self { tx }
    }
}

impl AppendLog for OpenLog {
    type Error = SerialError;

    fn append(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let tx = self.tx.as_mut().ok_or(SerialError::Unavailable)?;
        tx.blocking_write(bytes).map_err(SerialError::Uart)?;
        tx.blocking_flush().map_err(SerialError::Uart)
    }
}
