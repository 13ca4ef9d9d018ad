//! # Morse Beacon
//!
//! Text to Morse encoding and decoding, plus a transmission engine that sends
//! an encoded message as timed audio tones or light pulses.
//!
//! Timing follows the PARIS convention (`unit = 1200 ms / WPM`). Every element
//! of a transmission is scheduled from a single start instant, so long
//! messages do not drift, and at most one transmission runs at a time.

pub mod audio;
pub mod clock;
pub mod config;
pub mod cw;
pub mod error;
pub mod flash;
pub mod playback;
pub mod session;
pub mod testing;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Settings;
pub use cw::{
    decode, encode, encode_to_string, plan, Code, Interval, IntervalKind, Symbol, TimingModel,
    TransmissionPlan,
};
pub use error::{EngineError, Result};
pub use flash::FlashColor;
pub use playback::{Mode, OutputKind, PlaybackController};
pub use session::{CancelToken, SessionId};
