//! Intent dispatch and the handlers behind each command.

use crate::commands::{extract_payload, Intent};
use crate::config_loader::Settings;
use crate::dialogue::{Dialogue, EmailDraft, ReminderDraft};
use crate::ear::{Ear, Utterance};
use crate::engine::AudioOutput;
use crate::error::{LookupError, MailError, WeatherError};
use crate::reminder::ReminderScheduler;
use crate::services::jokes::JokeSource;
use crate::services::mail::{Email, Mailer};
use crate::services::media::MediaPlayer;
use crate::services::todo::TodoStore;
use crate::services::weather::WeatherProvider;
use crate::services::wikipedia::Encyclopedia;
use anyhow::Context;
use chrono::Local;
use std::sync::Arc;

pub const MSG_FALLBACK: &str =
    "I'm not sure how to handle that. Could you please rephrase your command?";
pub const MSG_DATE: &str =
    "I'm sorry, but that feature is not implemented yet. I'm still learning new tricks!";
pub const MSG_RELATIONSHIP: &str =
    "I am happily in a relationship with the Wi-Fi. It's a very stable connection.";
pub const MSG_SMART_HOME: &str =
    "This feature is currently a placeholder. Please connect your smart home API here.";

pub const MSG_PERSON_NOT_FOUND: &str = "I couldn't find any information on that person.";
pub const MSG_ENCYCLOPEDIA_DOWN: &str = "Sorry, I couldn't reach the encyclopedia right now.";

pub const MSG_TODO_MISSING: &str =
    "Your to-do list is empty. You can add items by saying \"add to-do\".";
pub const MSG_TODO_EMPTY: &str = "Your to-do list is currently empty.";
pub const MSG_TODO_HEADER: &str = "Your to-do list contains the following items:";

pub const MSG_WEATHER_NO_CITY: &str = "Please specify a city for the weather.";
pub const MSG_WEATHER_NO_KEY: &str =
    "The weather API key is not configured. Please add it to your config file.";

pub const MSG_EMAIL_NO_CREDENTIALS: &str =
    "Email credentials are not set up. Please configure your email in the config file.";
pub const MSG_EMAIL_AUTH: &str = "Failed to log in. Please check your email address and password, and ensure 'Less secure app access' is enabled for your Gmail account.";
pub const MSG_EMAIL_BAD_ADDRESS: &str = "I couldn't understand that email address.";
pub const MSG_EMAIL_FAILED: &str = "I'm sorry, but I was unable to send the email.";
pub const MSG_EMAIL_SENT: &str = "Email sent successfully.";

pub const MSG_REMINDER_BAD_TIME: &str = "I couldn't understand the time. Please try again.";

/// Ambiguous lookups suggest at most this many alternatives.
const AMBIGUOUS_SUGGESTIONS: usize = 3;

/// External capabilities the handlers call.
#[derive(Clone)]
pub struct Collaborators {
    pub output: Arc<dyn AudioOutput>,
    pub weather: Arc<dyn WeatherProvider>,
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub media: Arc<dyn MediaPlayer>,
    pub jokes: Arc<dyn JokeSource>,
    pub mailer: Arc<dyn Mailer>,
    pub todo: Arc<dyn TodoStore>,
}

/// What `dispatch` did with an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Empty utterance, nothing was said.
    Skipped,
    Handled(Intent),
    Fallback,
}

pub struct Dispatcher {
    settings: Arc<Settings>,
    ear: Arc<Ear>,
    services: Collaborators,
    reminders: ReminderScheduler,
}

impl Dispatcher {
    pub fn new(settings: Arc<Settings>, ear: Arc<Ear>, services: Collaborators) -> Self {
        let reminders = ReminderScheduler::new(services.output.clone());
        Self {
            settings,
            ear,
            services,
            reminders,
        }
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    /// Routes one utterance to the first intent whose trigger phrase it contains.
    ///
    /// Errors are those no handler anticipates (storage, speech output) and
    /// are left for the run loop.
    pub async fn dispatch(&self, utterance: &Utterance) -> anyhow::Result<Dispatched> {
        if utterance.is_empty() {
            return Ok(Dispatched::Skipped);
        }

        let command = utterance.as_str();
        let Some((intent, trigger)) = self.settings.commands.match_intent(command) else {
            tracing::debug!("No trigger phrase in '{}'", command);
            self.say(MSG_FALLBACK).await?;
            return Ok(Dispatched::Fallback);
        };

        tracing::debug!("Matched intent {} via '{}'", intent, trigger);
        let payload = extract_payload(command, trigger);
        match intent {
            Intent::PlayMedia => self.play_media(&payload).await?,
            Intent::Time => self.tell_time().await?,
            Intent::LookupPerson => self.lookup_person(&payload).await?,
            Intent::Date => self.say(MSG_DATE).await?,
            Intent::RelationshipStatus => self.say(MSG_RELATIONSHIP).await?,
            Intent::Joke => self.tell_joke().await?,
            Intent::AddTodo => self.add_todo(&payload).await?,
            Intent::ListTodo => self.list_todos().await?,
            Intent::Weather => self.weather(&payload).await?,
            Intent::SendEmail => self.send_email().await?,
            Intent::SetReminder => self.set_reminder().await?,
            Intent::SmartHome => self.say(MSG_SMART_HOME).await?,
        }
        Ok(Dispatched::Handled(intent))
    }

    async fn say(&self, text: &str) -> anyhow::Result<()> {
        self.services.output.speak(text).await?;
        Ok(())
    }

    /// Speaks each prompt of `draft` and feeds the next capture into it.
    async fn converse<D: Dialogue>(&self, mut draft: D) -> anyhow::Result<D> {
        while let Some(prompt) = draft.prompt() {
            self.say(prompt).await?;
            let answer = self.ear.capture().await;
            draft = draft.advance(answer);
        }
        Ok(draft)
    }

    async fn play_media(&self, song: &str) -> anyhow::Result<()> {
        self.say(&format!("Playing {} on YouTube.", song)).await?;
        if let Err(e) = self.services.media.play(song).await {
            tracing::warn!("Playback of '{}' failed: {}", song, e);
            self.say(&format!("Sorry, I couldn't start playback for {}.", song))
                .await?;
        }
        Ok(())
    }

    async fn tell_time(&self) -> anyhow::Result<()> {
        let now = Local::now().format("%I:%M %p").to_string();
        self.say(&format!("The current time is {}.", now)).await
    }

    async fn lookup_person(&self, person: &str) -> anyhow::Result<()> {
        match self.services.encyclopedia.summary(person).await {
            Ok(summary) => self.say(&summary).await,
            Err(LookupError::NotFound(_)) => self.say(MSG_PERSON_NOT_FOUND).await,
            Err(LookupError::Ambiguous { options, .. }) => {
                let examples = options
                    .iter()
                    .take(AMBIGUOUS_SUGGESTIONS)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.say(&format!(
                    "There are multiple results. Could you be more specific? For example: {}",
                    examples
                ))
                .await
            }
            Err(LookupError::Transport(reason)) => {
                tracing::warn!("Encyclopedia lookup for '{}' failed: {}", person, reason);
                self.say(MSG_ENCYCLOPEDIA_DOWN).await
            }
        }
    }

    async fn tell_joke(&self) -> anyhow::Result<()> {
        let joke = self.services.jokes.joke();
        self.say(&joke).await
    }

    async fn add_todo(&self, todo: &str) -> anyhow::Result<()> {
        self.services
            .todo
            .append(todo)
            .with_context(|| format!("failed to store to-do item '{}'", todo))?;
        self.say(&format!("Added \"{}\" to your to-do list.", todo))
            .await
    }

    async fn list_todos(&self) -> anyhow::Result<()> {
        let todos = self
            .services
            .todo
            .load()
            .context("failed to read the to-do list")?;
        match todos {
            None => self.say(MSG_TODO_MISSING).await,
            Some(todos) if todos.is_empty() => self.say(MSG_TODO_EMPTY).await,
            Some(todos) => {
                self.say(MSG_TODO_HEADER).await?;
                for (i, todo) in todos.iter().enumerate() {
                    self.say(&format!("Item {}: {}", i + 1, todo)).await?;
                }
                Ok(())
            }
        }
    }

    async fn weather(&self, city: &str) -> anyhow::Result<()> {
        if city.is_empty() {
            return self.say(MSG_WEATHER_NO_CITY).await;
        }
        let Some(api_key) = self.settings.weather_key() else {
            return self.say(MSG_WEATHER_NO_KEY).await;
        };

        match self.services.weather.current(city, api_key).await {
            Ok(report) => {
                self.say(&format!(
                    "The weather in {} is {} with a temperature of {} degrees Celsius.",
                    city, report.condition, report.temp_c
                ))
                .await
            }
            Err(WeatherError::Transport(reason)) => {
                tracing::warn!("Error fetching weather: {}", reason);
                self.say(&format!(
                    "Sorry, I could not get the weather information for {}.",
                    city
                ))
                .await
            }
            Err(WeatherError::Malformed(reason)) => {
                tracing::warn!("Unexpected weather payload for '{}': {}", city, reason);
                self.say(&format!(
                    "Could not parse the weather data for {}. Please check the city name.",
                    city
                ))
                .await
            }
        }
    }

    async fn send_email(&self) -> anyhow::Result<()> {
        let email = match self.converse(EmailDraft::new()).await? {
            EmailDraft::Complete(email) => email,
            unfinished => anyhow::bail!("email dialogue ended early: {:?}", unfinished),
        };
        if self.settings.email_credentials().is_none() {
            return self.say(MSG_EMAIL_NO_CREDENTIALS).await;
        }
        self.deliver(&email).await
    }

    async fn deliver(&self, email: &Email) -> anyhow::Result<()> {
        match self.services.mailer.send(email).await {
            Ok(()) => self.say(MSG_EMAIL_SENT).await,
            Err(MailError::MissingCredentials) => self.say(MSG_EMAIL_NO_CREDENTIALS).await,
            Err(MailError::InvalidAddress(address)) => {
                tracing::warn!("Unusable email address '{}'", address);
                self.say(MSG_EMAIL_BAD_ADDRESS).await
            }
            Err(MailError::Authentication(reason)) => {
                tracing::warn!("SMTP login rejected: {}", reason);
                self.say(MSG_EMAIL_AUTH).await
            }
            Err(MailError::Transport(reason)) => {
                tracing::error!("Failed to send email: {}", reason);
                self.say(MSG_EMAIL_FAILED).await
            }
        }
    }

    async fn set_reminder(&self) -> anyhow::Result<()> {
        match self.converse(ReminderDraft::new()).await? {
            ReminderDraft::Complete(job) => {
                let confirmation = format!(
                    "Okay, I'll remind you about {} in {} minutes.",
                    job.text, job.minutes
                );
                self.reminders.schedule(job);
                self.say(&confirmation).await
            }
            ReminderDraft::Rejected => self.say(MSG_REMINDER_BAD_TIME).await,
            unfinished => anyhow::bail!("reminder dialogue ended early: {:?}", unfinished),
        }
    }
}
