use thiserror::Error;

/// Errors surfaced by the transmission engine.
///
/// Encoding, decoding and planning never fail; only opening an output or
/// persisting settings can.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No audio clock could be obtained (missing device, stream failure,
    /// audio thread gone)
    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// Settings file could not be located or written
    #[error("settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
