//! Error types for sonora-tts
//!
//! Defines module-specific error types using thiserror. The variants follow
//! the user-facing taxonomy: validation, initialization, external-call and
//! decode failures, plus the audio/resource plumbing underneath them.

use thiserror::Error;

/// Main error type for sonora-tts
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any external call (blank text, too long,
    /// unknown voice)
    #[error("{0}")]
    Validation(String),

    /// Another generation is still in flight.
    ///
    /// Returned to the caller only: the UI error field belongs to the
    /// generation in flight and is left untouched.
    #[error("A speech generation is already in progress.")]
    Busy,

    /// Output context missing, closed or failed to open
    #[error("{0}")]
    Initialization(String),

    /// Speech API failure (network, auth, API error, empty payload)
    #[error("{0}")]
    ExternalCall(String),

    /// Raw PCM from the speech API could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Sample buffer too large for a RIFF container
    #[error("WAV encode error: {0}")]
    Encode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Download requested while no WAV resource is live
    #[error("No audio to download.")]
    NoAudio,

    /// The studio was torn down; late results are discarded
    #[error("Session is closed")]
    SessionClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for rejections that happen before any external call and leave
    /// the current audio untouched
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Busy)
    }

    /// Single message shown to the user for this error
    ///
    /// Failures of the generation pipeline are prefixed so the user can tell
    /// them apart from input problems.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(_) | Error::Busy | Error::NoAudio => self.to_string(),
            _ => format!("Failed to generate speech: {}", self),
        }
    }
}

impl From<sonora_common::Error> for Error {
    fn from(err: sonora_common::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convenience Result type using sonora-tts Error
pub type Result<T> = std::result::Result<T, Error>;
