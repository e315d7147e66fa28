//! Rule pair persistence in non-volatile memory
//!
//! ## Layout
//!
//! ```text
//! offset  size  content
//!      0     2  signature b"TZ"
//!      2    12  daylight rule
//!     14    12  standard rule
//!
//! rule record:
//!      0     6  abbreviation, ASCII, NUL padded
//!      6     1  week   (0 = last, 1-4)
//!      7     1  weekday (1 = Sunday .. 7 = Saturday)
//!      8     1  month  (1-12)
//!      9     1  hour   (0-23)
//!     10     2  UTC offset in minutes, i16 little endian
//! ```
//!
//! The whole image is written with a single store write. A power loss in
//! the middle of that write is not recovered from.

use core::fmt;

use hal_abstractions::NonVolatileStore;

use crate::fmt::Debug2Format;
use crate::time::{Abbrev, Month, RulePair, TimeChangeRule, Week, Weekday};

/// Marker proving the region holds a configuration written by this firmware
pub const SIGNATURE: [u8; 2] = *b"TZ";

const RULE_LEN: usize = 12;
const ABBREV_FIELD_LEN: usize = 6;

/// Bytes occupied in the store
pub const IMAGE_LEN: usize = SIGNATURE.len() + 2 * RULE_LEN;

/// Persisted configuration errors
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError<E> {
    /// Signature missing or unrecognized: nothing valid stored
    Signature,
    /// Signature present but the rule records do not decode
    Corrupt,
    /// Store access failed
    Store(E),
}

impl<E: fmt::Debug> fmt::Display for ConfigError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "no valid configuration stored"),
            Self::Corrupt => write!(f, "stored rules are corrupt"),
            Self::Store(e) => write!(f, "store error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for ConfigError<E> {}

/// Owner of the configuration region of a non-volatile store
pub struct PersistentConfig<S> {
    store: S,
}

impl<S: NonVolatileStore> PersistentConfig<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Signature check only
    pub fn is_valid(&mut self) -> bool {
        let mut signature = [0u8; 2];
        match self.store.read_bytes(0, &mut signature) {
            Ok(()) => signature == SIGNATURE,
            Err(e) => {
                warn!("Config signature read failed: {}", Debug2Format(&e));
                false
            }
        }
    }

    /// Read the stored rule pair
    pub fn load(&mut self) -> Result<RulePair, ConfigError<S::Error>> {
        let mut image = [0u8; IMAGE_LEN];
        self.store
            .read_bytes(0, &mut image)
            .map_err(ConfigError::Store)?;

        if image[..2] != SIGNATURE {
            return Err(ConfigError::Signature);
        }

        let daylight = decode_rule(&image[2..2 + RULE_LEN]).ok_or(ConfigError::Corrupt)?;
        let standard = decode_rule(&image[2 + RULE_LEN..]).ok_or(ConfigError::Corrupt)?;
        let rules = RulePair::new(daylight, standard).map_err(|_| ConfigError::Corrupt)?;
        debug!(
            "Loaded rules {}/{}",
            rules.daylight().abbrev,
            rules.standard().abbrev
        );
        Ok(rules)
    }

    /// Write signature and rule pair together
    pub fn save(&mut self, rules: &RulePair) -> Result<(), ConfigError<S::Error>> {
        let mut image = [0u8; IMAGE_LEN];
        image[..2].copy_from_slice(&SIGNATURE);
        encode_rule(rules.daylight(), &mut image[2..2 + RULE_LEN]);
        encode_rule(rules.standard(), &mut image[2 + RULE_LEN..]);

        self.store
            .write_bytes(0, &image)
            .map_err(ConfigError::Store)?;
        info!(
            "Saved rules {}/{}",
            rules.daylight().abbrev,
            rules.standard().abbrev
        );
        Ok(())
    }
}

fn encode_rule(rule: &TimeChangeRule, out: &mut [u8]) {
    let abbrev = rule.abbrev.as_bytes();
    out[..ABBREV_FIELD_LEN].fill(0);
    out[..abbrev.len()].copy_from_slice(abbrev);
    out[6] = rule.week.number();
    out[7] = rule.dow.number();
    out[8] = rule.month.number();
    out[9] = rule.hour;
    out[10..12].copy_from_slice(&rule.offset_minutes.to_le_bytes());
}

fn decode_rule(raw: &[u8]) -> Option<TimeChangeRule> {
    let name = &raw[..ABBREV_FIELD_LEN];
    let len = name.iter().position(|&b| b == 0).unwrap_or(ABBREV_FIELD_LEN);
    // Padding after the name must be all NUL
    if name[len..].iter().any(|&b| b != 0) {
        return None;
    }

    Some(TimeChangeRule {
        abbrev: Abbrev::from_bytes(&name[..len])?,
        week: Week::from_number(raw[6])?,
        dow: Weekday::from_number(raw[7])?,
        month: Month::from_number(raw[8])?,
        hour: raw[9],
        offset_minutes: i16::from_le_bytes([raw[10], raw[11]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStore;
    use crate::time::US_EASTERN;

    #[test]
    fn test_blank_store_is_invalid() {
        let mut config = PersistentConfig::new(MemStore::new(64));
        assert!(!config.is_valid());
        assert_eq!(config.load(), Err(ConfigError::Signature));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = MemStore::new(64);
        let mut config = PersistentConfig::new(store.clone());
        config.save(&US_EASTERN).unwrap();

        assert!(config.is_valid());
        assert_eq!(config.load(), Ok(US_EASTERN));
        assert_eq!(store.writes(), 1);
        assert_eq!(&store.bytes()[..2], b"TZ");

        // A fresh owner over the same memory sees the same rules
        let mut reopened = PersistentConfig::new(store);
        assert_eq!(reopened.load(), Ok(US_EASTERN));
    }

    #[test]
    fn test_any_other_signature_is_rejected() {
        let store = MemStore::new(64);
        let mut config = PersistentConfig::new(store.clone());
        config.save(&US_EASTERN).unwrap();

        for (a, b) in [(0x00, 0x00), (0xFF, 0xFF), (b'T', b'X'), (b'X', b'Z'), (b'Z', b'T')] {
            store.poke(0, a);
            store.poke(1, b);
            assert!(!config.is_valid());
            assert_eq!(config.load(), Err(ConfigError::Signature));
        }

        store.poke(0, b'T');
        store.poke(1, b'Z');
        assert_eq!(config.load(), Ok(US_EASTERN));
    }

    #[test]
    fn test_layout() {
        let store = MemStore::new(IMAGE_LEN);
        let mut config = PersistentConfig::new(store.clone());
        config.save(&US_EASTERN).unwrap();

        let bytes = store.bytes();
        assert_eq!(
            &bytes[2..14],
            &[b'E', b'D', b'T', 0, 0, 0, 2, 1, 3, 2, 0x10, 0xFF]
        );
        assert_eq!(
            &bytes[14..26],
            &[b'E', b'S', b'T', 0, 0, 0, 1, 1, 11, 2, 0xD4, 0xFE]
        );
    }

    #[test]
    fn test_corrupt_records_are_rejected() {
        let store = MemStore::new(64);
        let mut config = PersistentConfig::new(store.clone());
        config.save(&US_EASTERN).unwrap();

        // Month 13 in the daylight rule
        store.poke(10, 13);
        assert!(config.is_valid());
        assert_eq!(config.load(), Err(ConfigError::Corrupt));
        store.poke(10, 3);

        // Garbage after the abbreviation terminator
        store.poke(6, b'X');
        assert_eq!(config.load(), Err(ConfigError::Corrupt));
        store.poke(6, 0);

        assert_eq!(config.load(), Ok(US_EASTERN));
    }

    #[test]
    fn test_store_fault_is_reported() {
        // Region too small for the image
        let mut config = PersistentConfig::new(MemStore::new(8));
        assert!(matches!(config.load(), Err(ConfigError::Store(_))));
        assert!(matches!(config.save(&US_EASTERN), Err(ConfigError::Store(_))));
    }
}
