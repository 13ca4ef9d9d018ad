use std::time::Duration;

use super::{Code, Symbol};

/// Slowest supported rate
pub const MIN_WPM: u32 = 5;
/// Fastest supported rate
pub const MAX_WPM: u32 = 50;
pub const DEFAULT_WPM: u32 = 20;

/// Dit length at 1 WPM in microseconds.
///
/// Standard Morse timing: 1 word = 50 dit-lengths
/// "PARIS" is the standard word used for WPM measurement
/// dit_ms = 1200 / wpm
const PARIS_DIT_US: u64 = 1_200_000;

/// Element and gap durations derived from a words-per-minute rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingModel {
    rate: u32,
}

impl TimingModel {
    /// Build the model for `rate`, clamped to [`MIN_WPM`, `MAX_WPM`]
    pub fn from_rate(rate: u32) -> Self {
        Self {
            rate: rate.clamp(MIN_WPM, MAX_WPM),
        }
    }

    /// The effective (clamped) rate
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Dit duration
    pub fn unit(&self) -> Duration {
        Duration::from_micros(PARIS_DIT_US / u64::from(self.rate))
    }

    /// Dah duration (3x dit)
    pub fn dash(&self) -> Duration {
        self.unit() * 3
    }

    /// Gap between symbols of one character (1x dit)
    pub fn intra_char_gap(&self) -> Duration {
        self.unit()
    }

    /// Gap between characters (3x dit)
    pub fn inter_char_gap(&self) -> Duration {
        self.unit() * 3
    }

    /// Gap between words (7x dit)
    pub fn word_gap(&self) -> Duration {
        self.unit() * 7
    }

    pub fn symbol(&self, symbol: Symbol) -> Duration {
        match symbol {
            Symbol::Dot => self.unit(),
            Symbol::Dash => self.dash(),
        }
    }

    /// On-air length of a single code: its symbols plus the gaps between them
    pub fn duration_of(&self, code: &Code) -> Duration {
        match code {
            Code::WordGap => self.word_gap(),
            Code::Symbols(symbols) => {
                let keyed: Duration = symbols.iter().map(|s| self.symbol(*s)).sum();
                let gaps = symbols.len().saturating_sub(1) as u32;
                keyed + self.intra_char_gap() * gaps
            }
        }
    }

    /// Estimate WPM from a dit duration in milliseconds, clamped to the supported range
    pub fn estimate_wpm(dit_ms: f32) -> u32 {
        if dit_ms <= 0.0 {
            return MAX_WPM;
        }
        let wpm = (1200.0 / dit_ms).round();
        (wpm as u32).clamp(MIN_WPM, MAX_WPM)
    }
}

impl Default for TimingModel {
    fn default() -> Self {
        Self::from_rate(DEFAULT_WPM)
    }
}
