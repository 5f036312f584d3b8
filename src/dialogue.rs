//! Per-field state for the multi-turn intents.
//!
//! Each draft is advanced with one captured answer at a time. The handler
//! speaks [`Dialogue::prompt`], captures, and feeds the answer back in until
//! the draft reports no further prompt.

use crate::ear::Utterance;
use crate::reminder::ReminderJob;
use crate::services::mail::Email;
use std::time::Duration;

pub trait Dialogue: Sized {
    /// What to ask next, or `None` once the draft is finished.
    fn prompt(&self) -> Option<&'static str>;

    fn advance(self, answer: Utterance) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailDraft {
    AwaitingRecipient,
    AwaitingSubject { to: String },
    AwaitingBody { to: String, subject: String },
    Complete(Email),
}

impl EmailDraft {
    pub fn new() -> Self {
        Self::AwaitingRecipient
    }
}

impl Default for EmailDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialogue for EmailDraft {
    fn prompt(&self) -> Option<&'static str> {
        match self {
            Self::AwaitingRecipient => Some("Who is the recipient?"),
            Self::AwaitingSubject { .. } => Some("What is the subject of the email?"),
            Self::AwaitingBody { .. } => Some("And what is the message?"),
            Self::Complete(_) => None,
        }
    }

    // Empty answers are kept as empty fields.
    fn advance(self, answer: Utterance) -> Self {
        let answer = answer.into_string();
        match self {
            Self::AwaitingRecipient => Self::AwaitingSubject { to: answer },
            Self::AwaitingSubject { to } => Self::AwaitingBody {
                to,
                subject: answer,
            },
            Self::AwaitingBody { to, subject } => Self::Complete(Email {
                to,
                subject,
                body: answer,
            }),
            done @ Self::Complete(_) => done,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReminderDraft {
    AwaitingText,
    AwaitingDelay { text: String },
    Complete(ReminderJob),
    Rejected,
}

impl ReminderDraft {
    pub fn new() -> Self {
        Self::AwaitingText
    }
}

impl Default for ReminderDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialogue for ReminderDraft {
    fn prompt(&self) -> Option<&'static str> {
        match self {
            Self::AwaitingText => Some("What should I remind you about?"),
            Self::AwaitingDelay { .. } => Some("In how many minutes?"),
            Self::Complete(_) | Self::Rejected => None,
        }
    }

    fn advance(self, answer: Utterance) -> Self {
        match self {
            Self::AwaitingText => Self::AwaitingDelay {
                text: answer.into_string(),
            },
            Self::AwaitingDelay { text } => match parse_minutes(answer.as_str()) {
                Some(minutes) => Self::Complete(ReminderJob { minutes, text }),
                None => Self::Rejected,
            },
            done => done,
        }
    }
}

/// Minutes from the first word of `answer`, if it is a usable positive delay.
pub fn parse_minutes(answer: &str) -> Option<f64> {
    let minutes: f64 = answer.split_whitespace().next()?.parse().ok()?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(minutes * 60.0).ok()?;
    Some(minutes)
}
