//! Station configuration
//!
//! Compile-time choices a board makes when it builds a [`Station`]. Nothing
//! here is persisted; the only runtime-persisted setting is the rule pair.
//!
//! [`Station`]: crate::station::Station

use crate::display::{DisplayLayout, LCD_16X2};
use crate::sensor::SensorSources;
use crate::time::{RulePair, DEFAULT_SYNC_INTERVAL_SECS, US_EASTERN};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConfig {
    /// Hardware clock re-read interval
    pub sync_interval_secs: u32,
    /// Handed to [`SensorBank::new`] when the board builds its sensors
    ///
    /// [`SensorBank::new`]: crate::sensor::SensorBank::new
    pub sources: SensorSources,
    pub layout: DisplayLayout,
    /// Rules used until the operator has set the clock once
    pub default_rules: RulePair,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            sources: SensorSources::default(),
            layout: LCD_16X2,
            default_rules: US_EASTERN,
        }
    }
}

impl StationConfig {
    pub fn with_sync_interval(mut self, secs: u32) -> Self {
        self.sync_interval_secs = secs;
        self
    }

    pub fn with_sources(mut self, sources: SensorSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_layout(mut self, layout: DisplayLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_default_rules(mut self, rules: RulePair) -> Self {
        self.default_rules = rules;
        self
    }
}
