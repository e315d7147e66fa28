//! 128x64 SSD1306 OLED driven as a 16x8 character terminal

use defmt::{error, Debug2Format};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use hal_abstractions::CharDisplay;
use ssd1306::mode::TerminalModeError;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

type Driver =
    Ssd1306<I2CInterface<I2c<'static, Blocking>>, DisplaySize128x64, TerminalMode>;

#[derive(Debug)]
pub struct OledError(pub TerminalModeError);

/// Terminal-mode panel; writes are dropped when the panel did not come up
pub struct OledTerminal {
    display: Option<Driver>,
}

impl OledTerminal {
    /// Initialize the controller and blank the panel
    pub fn new(i2c: I2c<'static, Blocking>) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_terminal_mode();
        let ready = display.init().and_then(|()| display.clear());
        match ready {
            Ok(()) => Self {
                display: Some(display),
            },
            Err(e) => {
                error!("OLED init failed: {}", Debug2Format(&e));
                Self { display: None }
            }
        }
    }
}

impl CharDisplay for OledTerminal {
    type Error = OledError;

    fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<(), OledError> {
        let Some(display) = self.display.as_mut() else {
            return Ok(());
        };
        display.set_position(col, row).map_err(OledError)?;
        for c in text.chars() {
            display.print_char(c).map_err(OledError)?;
        }
        Ok(())
    }
}
