pub mod espeak;
pub mod microphone;
pub mod whisper;

use crate::error::CaptureError;
use async_trait::async_trait;
use std::time::Duration;

/// Trait that all speech synthesis backends must implement.
/// Lets the audio engine swap eSpeak for another synthesizer.
pub trait SpeechBackend: Send + Sync {
    /// Returns WAV bytes for the given text or an error
    fn synthesize(&self, text: &str) -> std::io::Result<Vec<u8>>;

    /// Returns the unique ID of the backend (e.g., "espeak-ng")
    fn id(&self) -> &'static str;
}

/// Bounds for a single listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenWindow {
    /// How long to wait for speech to start.
    pub timeout: Duration,
    /// Longest phrase recorded once speech has started.
    pub phrase_limit: Duration,
}

/// Speech-to-text capture. Returns the raw recognized text or a classified failure.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, window: ListenWindow) -> Result<String, CaptureError>;
}
