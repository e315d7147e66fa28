//! Storage collaborators: byte-addressable non-volatile memory and the
//! durable append-only sample log

use core::fmt::Debug;

/// Byte-addressable non-volatile memory (EEPROM, backup registers, ...)
///
/// Offsets are relative to the region reserved for the logger.
pub trait NonVolatileStore {
    /// Access fault or out-of-range offset
    type Error: Debug;

    /// Fill `buf` with the bytes stored at `offset..offset + buf.len()`
    fn read_bytes(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Store `bytes` at `offset..offset + bytes.len()`
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Durable append-only log (SD card file, serial data logger, ...)
pub trait AppendLog {
    /// Write fault; the record may or may not have been stored
    type Error: Debug;

    /// Append one complete record
    fn append(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}
