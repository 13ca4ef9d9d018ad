mod decoder;
mod encoder;
mod planner;
mod table;
mod timing;

use std::fmt;

pub use decoder::{decode, decode_tokens};
pub use encoder::{encode, encode_report, encode_to_string, EncodeReport};
pub use planner::{as_millis, plan, plan_with_gaps, Interval, IntervalKind, TransmissionPlan};
pub use table::{char_for, pattern_for, supported_chars, WORD_SEPARATOR};
pub use timing::{TimingModel, DEFAULT_WPM, MAX_WPM, MIN_WPM};

/// A single keyed element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Dot,
    Dash,
}

impl Symbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Symbol::Dot),
            '-' => Some(Symbol::Dash),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::Dot => '.',
            Symbol::Dash => '-',
        }
    }
}

/// The dot/dash sequence of one character, or the word separator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    /// Never empty
    Symbols(Vec<Symbol>),
    WordGap,
}

impl Code {
    /// Parse a written token (`.-`, `/`); anything else is a miss
    pub fn parse(token: &str) -> Option<Self> {
        if token == WORD_SEPARATOR {
            return Some(Code::WordGap);
        }
        let symbols: Option<Vec<Symbol>> = token.chars().map(Symbol::from_char).collect();
        match symbols {
            Some(s) if !s.is_empty() => Some(Code::Symbols(s)),
            _ => None,
        }
    }

    pub fn is_word_gap(&self) -> bool {
        matches!(self, Code::WordGap)
    }

    /// Symbols of the code; empty for the word gap
    pub fn symbols(&self) -> &[Symbol] {
        match self {
            Code::Symbols(s) => s,
            Code::WordGap => &[],
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::WordGap => f.write_str(WORD_SEPARATOR),
            Code::Symbols(symbols) => {
                for s in symbols {
                    write!(f, "{}", s.as_char())?;
                }
                Ok(())
            }
        }
    }
}
