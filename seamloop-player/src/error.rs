//! Error types for seamloop-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for seamloop-player
#[derive(Error, Debug)]
pub enum Error {
    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Errors raised by a source while producing audio
    #[error("Source error: {0}")]
    Source(String),
}

/// Convenience Result type using seamloop-player Error
pub type Result<T> = std::result::Result<T, Error>;
