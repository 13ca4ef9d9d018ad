use std::io::{self, Write};

use parking_lot::Mutex;

use super::{FlashColor, LightSink};

const BLOCK: &str = "\u{2588}\u{2588}\u{2588}\u{2588}";

/// Draws the light as a colored block on one terminal line
pub struct TerminalLight {
    color: Mutex<FlashColor>,
}

impl TerminalLight {
    pub fn new() -> Self {
        Self {
            color: Mutex::new(FlashColor::default()),
        }
    }

    fn ansi(color: FlashColor) -> &'static str {
        match color {
            FlashColor::White => "\x1b[97m",
            FlashColor::Yellow => "\x1b[93m",
            FlashColor::Red => "\x1b[91m",
            FlashColor::Blue => "\x1b[94m",
        }
    }
}

impl Default for TerminalLight {
    fn default() -> Self {
        Self::new()
    }
}

impl LightSink for TerminalLight {
    fn set_color(&self, color: FlashColor) {
        *self.color.lock() = color;
    }

    fn set_lit(&self, lit: bool) {
        let color = *self.color.lock();
        let mut err = io::stderr().lock();
        // Redraw in place; a failed write only loses a frame
        let _ = if lit {
            write!(err, "\r{}{}\x1b[0m", Self::ansi(color), BLOCK)
        } else {
            write!(err, "\r{}", " ".repeat(4))
        };
        let _ = err.flush();
    }
}
