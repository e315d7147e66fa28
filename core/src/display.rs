//! Display layout and change-only rendering
//!
//! Geometry is data: a [`DisplayLayout`] names the slot of each field, and
//! fields a layout has no room for are simply `None`. [`Screen`] remembers
//! what each slot currently shows and only talks to the display when the
//! text of a field changes.

use core::fmt::Write;

use hal_abstractions::CharDisplay;
use heapless::String;

use crate::fmt::Debug2Format;
use crate::format;
use crate::sensor::SensorReading;
use crate::time::{Abbrev, Instant};

/// Widest slot any layout may declare
pub const MAX_SLOT_WIDTH: usize = 20;

type Cell = String<MAX_SLOT_WIDTH>;

/// Fixed position and width of one field
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub row: u8,
    pub col: u8,
    pub width: u8,
}

impl Slot {
    pub const fn new(row: u8, col: u8, width: u8) -> Self {
        Self { row, col, width }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLayout {
    pub rows: u8,
    pub cols: u8,
    pub date: Option<Slot>,
    pub time: Option<Slot>,
    pub zone: Option<Slot>,
    pub temperature: Option<Slot>,
    pub humidity: Option<Slot>,
    pub status: Option<Slot>,
}

/// 16x2 character LCD
///
/// ```text
/// 10:30:00  21.5C
/// 2024-03-15 40.2%
/// ```
/// A humidity of 100.0 loses its unit.
pub const LCD_16X2: DisplayLayout = DisplayLayout {
    rows: 2,
    cols: 16,
    date: Some(Slot::new(1, 0, 10)),
    time: Some(Slot::new(0, 0, 8)),
    zone: None,
    temperature: Some(Slot::new(0, 10, 6)),
    humidity: Some(Slot::new(1, 11, 5)),
    status: None,
};

/// 20x4 character LCD
///
/// ```text
/// 2024-03-15 EDT
/// 10:30:00      SYNC?
/// 21.5C
/// 40.2%
/// ```
pub const LCD_20X4: DisplayLayout = DisplayLayout {
    rows: 4,
    cols: 20,
    date: Some(Slot::new(0, 0, 10)),
    time: Some(Slot::new(1, 0, 8)),
    zone: Some(Slot::new(0, 11, 5)),
    temperature: Some(Slot::new(2, 0, 7)),
    humidity: Some(Slot::new(3, 0, 7)),
    status: Some(Slot::new(1, 14, 6)),
};

/// 128x64 OLED in 8x8 font terminal mode
pub const TERMINAL_16X8: DisplayLayout = DisplayLayout {
    rows: 8,
    cols: 16,
    date: Some(Slot::new(0, 0, 10)),
    time: Some(Slot::new(1, 0, 8)),
    zone: Some(Slot::new(0, 11, 5)),
    temperature: Some(Slot::new(3, 0, 7)),
    humidity: Some(Slot::new(4, 0, 7)),
    status: Some(Slot::new(7, 0, 16)),
};

/// Condition shown in the status slot
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    /// Hardware clock unreadable; time is free running
    Unsynced,
    /// Last append to the sample log failed
    LogFault,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Status::Ok => "",
            Status::Unsynced => "SYNC?",
            Status::LogFault => "LOG!",
        }
    }
}

/// Everything one refresh shows
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub local: Instant,
    pub zone: &'a Abbrev,
    pub reading: &'a SensorReading,
    pub status: Status,
}

#[derive(Clone, Copy)]
enum Field {
    Date,
    Time,
    Zone,
    Temperature,
    Humidity,
    Status,
}

const FIELDS: usize = 6;

/// Display plus a cache of what it shows
pub struct Screen<D> {
    display: D,
    layout: DisplayLayout,
    shown: [Option<Cell>; FIELDS],
}

impl<D: CharDisplay> Screen<D> {
    pub fn new(display: D, layout: DisplayLayout) -> Self {
        Self {
            display,
            layout,
            shown: Default::default(),
        }
    }

    pub fn layout(&self) -> &DisplayLayout {
        &self.layout
    }

    /// Forget the cache so the next refresh rewrites every field
    pub fn invalidate(&mut self) {
        self.shown = Default::default();
    }

    pub fn show(&mut self, view: &View<'_>) {
        let layout = self.layout;
        let dt = view.local.to_datetime();
        let reading = view.reading;

        self.put(Field::Date, layout.date, &format::date(&dt));
        self.put(Field::Time, layout.time, &format::time(&dt));
        self.put(Field::Zone, layout.zone, view.zone.as_str());
        self.put(
            Field::Temperature,
            layout.temperature,
            &with_unit(format::valid_temperature(reading.temperature_c), 'C'),
        );
        self.put(
            Field::Humidity,
            layout.humidity,
            &with_unit(format::valid_humidity(reading.humidity_pct), '%'),
        );
        self.put(Field::Status, layout.status, view.status.text());
    }

    fn put(&mut self, field: Field, slot: Option<Slot>, text: &str) {
        let Some(slot) = slot else {
            return;
        };

        let width = (slot.width as usize).min(MAX_SLOT_WIDTH);
        let mut cell = Cell::new();
        for c in text.chars().take(width) {
            if cell.push(c).is_err() {
                break;
            }
        }
        while cell.chars().count() < width && cell.push(' ').is_ok() {}

        let cached = &mut self.shown[field as usize];
        if cached.as_ref() == Some(&cell) {
            return;
        }
        match self.display.write_at(slot.row, slot.col, &cell) {
            Ok(()) => *cached = Some(cell),
            Err(e) => {
                warn!("Display write failed: {}", Debug2Format(&e));
                // Retry on the next refresh
                *cached = None;
            }
        }
    }
}

fn with_unit(value: Option<f32>, unit: char) -> Cell {
    let mut text = Cell::new();
    // Fits: at most six characters
    let _ = match value {
        Some(v) => write!(text, "{:.1}{}", v, unit),
        None => write!(text, "{}", format::PLACEHOLDER),
    };
    text
}
