//! Character-grid display surface

use core::fmt::Debug;

/// Display addressed as a grid of character cells
///
/// Implementations cover HD44780-style LCDs as well as graphic panels
/// driven in a text mode. Geometry is not exposed; callers position text
/// from their own layout.
pub trait CharDisplay {
    /// Bus or controller fault
    type Error: Debug;

    /// Write `text` starting at `row`, `col` (both zero based)
    fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<(), Self::Error>;
}
