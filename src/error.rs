//! Error kinds returned by the assistant's collaborators.
//!
//! Each handler matches on these to pick what to say. Anything that is not one
//! of these kinds travels as an `anyhow::Error` up to the run loop.

use thiserror::Error;

/// Why a speech capture produced no text.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Audio was recorded but nothing intelligible came out of it.
    #[error("could not understand audio")]
    Unintelligible,

    /// The recognition engine or input device cannot be used.
    #[error("speech recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Anything else (listen timeout, stream errors, I/O).
    #[error("capture failed: {0}")]
    Other(String),
}

/// Failure to render speech.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] std::io::Error),

    #[error("audio playback failed: {0}")]
    Playback(String),

    #[error("audio thread has stopped")]
    Disconnected,
}

/// Weather lookup failures, split the way the weather handler reports them.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Connection, timeout or non-success HTTP status.
    #[error("weather request failed: {0}")]
    Transport(String),

    /// The body arrived but lacks the expected fields.
    #[error("malformed weather response: {0}")]
    Malformed(String),
}

/// Encyclopedia lookup outcomes other than a summary.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no page found for '{0}'")]
    NotFound(String),

    /// The subject names a disambiguation page; holds the candidate titles.
    #[error("'{subject}' is ambiguous")]
    Ambiguous { subject: String, options: Vec<String> },

    #[error("encyclopedia request failed: {0}")]
    Transport(String),
}

/// Email submission failures.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("email credentials are not configured")]
    MissingCredentials,

    #[error("invalid email address '{0}'")]
    InvalidAddress(String),

    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    #[error("email transport failed: {0}")]
    Transport(String),
}

/// Media playback failures.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no video found for '{0}'")]
    NotFound(String),

    #[error("media search failed: {0}")]
    Search(String),

    #[error("could not open the player: {0}")]
    Launch(#[from] std::io::Error),
}
