//! RTC backup registers as byte-addressable storage
//!
//! The backup domain survives resets and runs from VBAT with the main supply
//! removed, which is all the persisted rule pair needs. Register 0 is left
//! alone; registers 1..=8 give 32 bytes.

use defmt::Format;
use hal_abstractions::NonVolatileStore;

use crate::clock::SharedRtc;

const FIRST_REGISTER: usize = 1;
const REGISTER_COUNT: usize = 8;

/// Capacity in bytes
pub const CAPACITY: usize = REGISTER_COUNT * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum BackupError {
    OutOfRange { offset: usize, len: usize },
    Register(usize),
}

pub struct BackupStore {
    rtc: &'static SharedRtc,
}

impl BackupStore {
    pub fn new(rtc: &'static SharedRtc) -> Self {
        Self { rtc }
    }

    fn check(offset: usize, len: usize) -> Result<(), BackupError> {
        match offset.checked_add(len) {
            Some(end) if end <= CAPACITY => Ok(()),
            _ => Err(BackupError::OutOfRange { offset, len }),
        }
    }

    fn read_register(&self, index: usize) -> Result<u32, BackupError> {
        critical_section::with(|cs| {
            self.rtc
                .borrow_ref(cs)
                .read_backup_register(FIRST_REGISTER + index)
        })
        .ok_or(BackupError::Register(index))
    }
}

impl NonVolatileStore for BackupStore {
    type Error = BackupError;

    fn read_bytes(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), BackupError> {
        Self::check(offset, buf.len())?;
        for (i, byte) in buf.iter_mut().enumerate() {
            let pos = offset + i;
            let word = self.read_register(pos / 4)?;
            *byte = word.to_le_bytes()[pos % 4];
        }
        Ok(())
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BackupError> {
        Self::check(offset, bytes.len())?;
        for (i, &byte) in bytes.iter().enumerate() {
            let pos = offset + i;
            let index = pos / 4;
            let mut word = self.read_register(index)?.to_le_bytes();
            word[pos % 4] = byte;
            critical_section::with(|cs| {
                self.rtc
                    .borrow_ref(cs)
                    .write_backup_register(FIRST_REGISTER + index, u32::from_le_bytes(word))
            });
        }
        Ok(())
    }
}
