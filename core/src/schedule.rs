//! Wall-clock aligned sampling cadence
//!
//! A cycle is due at second 0 of every minute divisible by five, plus once
//! unconditionally on the first poll after boot. The decision is made from
//! UTC instants only, so it does not depend on how often the main loop runs.

use crate::time::Instant;

/// Sampling period
pub const SAMPLE_INTERVAL_SECS: u64 = 300;

/// A cycle that must run now
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    /// `at / SAMPLE_INTERVAL_SECS`
    pub bucket: u64,
    pub at: Instant,
    /// First cycle since boot, not necessarily on a boundary
    pub cold_start: bool,
}

/// Edge-triggered scheduler state
///
/// `poll` only reports; the bucket is recorded by `acknowledge`, so a
/// cycle the caller could not start is reported again on the next poll.
#[derive(Debug, Default)]
pub struct SampleScheduler {
    last_bucket: Option<u64>,
}

impl SampleScheduler {
    pub const fn new() -> Self {
        Self { last_bucket: None }
    }

    pub fn poll(&self, now: Instant) -> Option<Due> {
        let t = now.as_secs();
        let bucket = t / SAMPLE_INTERVAL_SECS;
        match self.last_bucket {
            None => Some(Due {
                bucket,
                at: now,
                cold_start: true,
            }),
            Some(last) if t % SAMPLE_INTERVAL_SECS == 0 && bucket != last => Some(Due {
                bucket,
                at: now,
                cold_start: false,
            }),
            Some(_) => None,
        }
    }

    /// Record a completed cycle and return to idle
    pub fn acknowledge(&mut self, due: Due) {
        trace!("Sample bucket {} done", due.bucket);
        self.last_bucket = Some(due.bucket);
    }

    pub fn last_bucket(&self) -> Option<u64> {
        self.last_bucket
    }
}
