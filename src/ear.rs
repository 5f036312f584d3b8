use crate::backends::{ListenWindow, SpeechRecognizer};
use crate::engine::AudioOutput;
use crate::error::CaptureError;
use std::fmt;
use std::sync::Arc;

pub const MSG_UNINTELLIGIBLE: &str = "Sorry, I couldn't quite catch that. Could you please repeat?";
pub const MSG_SERVICE_UNAVAILABLE: &str =
    "My apologies, my speech recognition service is currently unavailable.";
pub const MSG_CAPTURE_FAILED: &str = "I've encountered an issue. Please try again in a moment.";

/// A normalized command: lowercase, wake word removed, trimmed.
///
/// Empty means nothing actionable was heard this turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance(String);

impl Utterance {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases `raw`, drops the first occurrence of the wake word and trims.
pub fn normalize(raw: &str, wake_word: &str) -> Utterance {
    let command = raw.to_lowercase();
    let wake_word = wake_word.trim().to_lowercase();
    let command = if !wake_word.is_empty() && command.contains(&wake_word) {
        command.replacen(&wake_word, "", 1)
    } else {
        command
    };
    Utterance(command.trim().to_string())
}

/// Utterance normalizer: listens once and turns the result into an [`Utterance`].
pub struct Ear {
    recognizer: Arc<dyn SpeechRecognizer>,
    output: Arc<dyn AudioOutput>,
    wake_word: String,
    window: ListenWindow,
}

impl Ear {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        output: Arc<dyn AudioOutput>,
        wake_word: &str,
        window: ListenWindow,
    ) -> Self {
        Self {
            recognizer,
            output,
            wake_word: wake_word.to_string(),
            window,
        }
    }

    /// Listens for one command.
    ///
    /// Never fails: every capture failure is spoken once and reported as an
    /// empty utterance, so callers skip the turn without apologising again.
    pub async fn capture(&self) -> Utterance {
        match self.recognizer.recognize(self.window).await {
            Ok(raw) => {
                let utterance = normalize(&raw, &self.wake_word);
                tracing::info!("You said: {}", utterance);
                utterance
            }
            Err(CaptureError::Unintelligible) => {
                self.apologise(MSG_UNINTELLIGIBLE).await;
                Utterance::empty()
            }
            Err(CaptureError::ServiceUnavailable(reason)) => {
                tracing::warn!("Speech recognition unavailable: {}", reason);
                self.apologise(MSG_SERVICE_UNAVAILABLE).await;
                Utterance::empty()
            }
            Err(CaptureError::Other(reason)) => {
                tracing::error!("An unexpected error occurred during command capture: {}", reason);
                self.apologise(MSG_CAPTURE_FAILED).await;
                Utterance::empty()
            }
        }
    }

    async fn apologise(&self, message: &str) {
        if let Err(e) = self.output.speak(message).await {
            tracing::warn!("Could not speak capture apology: {}", e);
        }
    }
}
