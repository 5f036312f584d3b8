//! Command table and trigger-phrase matching.

use serde::Deserialize;
use std::fmt;

/// Every command category the assistant understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    PlayMedia,
    Time,
    LookupPerson,
    Date,
    RelationshipStatus,
    Joke,
    AddTodo,
    ListTodo,
    Weather,
    SendEmail,
    SetReminder,
    SmartHome,
}

impl Intent {
    /// Matching order. Earlier entries win when an utterance contains more
    /// than one trigger phrase.
    pub const ALL: [Intent; 12] = [
        Intent::PlayMedia,
        Intent::Time,
        Intent::LookupPerson,
        Intent::Date,
        Intent::RelationshipStatus,
        Intent::Joke,
        Intent::AddTodo,
        Intent::ListTodo,
        Intent::Weather,
        Intent::SendEmail,
        Intent::SetReminder,
        Intent::SmartHome,
    ];

    /// Key under `commands` in the configuration file.
    pub fn config_key(self) -> &'static str {
        match self {
            Intent::PlayMedia => "play",
            Intent::Time => "time",
            Intent::LookupPerson => "who_the_heck_is",
            Intent::Date => "date",
            Intent::RelationshipStatus => "are_you_single",
            Intent::Joke => "joke",
            Intent::AddTodo => "add_to_do",
            Intent::ListTodo => "list_to_do",
            Intent::Weather => "weather",
            Intent::SendEmail => "send_email",
            Intent::SetReminder => "set_reminder",
            Intent::SmartHome => "smart_home",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Trigger phrase for each intent, as read from the `commands` section.
///
/// Every key is required; a configuration that omits one fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandTable {
    pub play: String,
    pub time: String,
    pub who_the_heck_is: String,
    pub date: String,
    pub are_you_single: String,
    pub joke: String,
    pub add_to_do: String,
    pub list_to_do: String,
    pub weather: String,
    pub send_email: String,
    pub set_reminder: String,
    pub smart_home: String,
}

impl CommandTable {
    pub fn trigger(&self, intent: Intent) -> &str {
        match intent {
            Intent::PlayMedia => &self.play,
            Intent::Time => &self.time,
            Intent::LookupPerson => &self.who_the_heck_is,
            Intent::Date => &self.date,
            Intent::RelationshipStatus => &self.are_you_single,
            Intent::Joke => &self.joke,
            Intent::AddTodo => &self.add_to_do,
            Intent::ListTodo => &self.list_to_do,
            Intent::Weather => &self.weather,
            Intent::SendEmail => &self.send_email,
            Intent::SetReminder => &self.set_reminder,
            Intent::SmartHome => &self.smart_home,
        }
    }

    /// Entries in matching order.
    pub fn iter(&self) -> impl Iterator<Item = (Intent, &str)> + '_ {
        Intent::ALL
            .iter()
            .map(move |&intent| (intent, self.trigger(intent)))
    }

    /// Finds the first intent whose trigger phrase occurs in `text`.
    ///
    /// # Returns
    /// * `Some((intent, trigger))` - The earliest matching entry.
    /// * `None` - No trigger phrase occurs in the text.
    pub fn match_intent(&self, text: &str) -> Option<(Intent, &str)> {
        if text.is_empty() {
            return None;
        }
        self.iter().find(|(_, trigger)| text.contains(trigger))
    }

    /// Rejects blank trigger phrases, which would match every utterance.
    pub fn validate(&self) -> Result<(), String> {
        let blank: Vec<&str> = self
            .iter()
            .filter(|(_, trigger)| trigger.trim().is_empty())
            .map(|(intent, _)| intent.config_key())
            .collect();
        if blank.is_empty() {
            Ok(())
        } else {
            Err(format!("empty trigger phrase for: {}", blank.join(", ")))
        }
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            play: "play".to_string(),
            time: "time".to_string(),
            who_the_heck_is: "who the heck is".to_string(),
            date: "date".to_string(),
            are_you_single: "are you single".to_string(),
            joke: "joke".to_string(),
            add_to_do: "add to do".to_string(),
            list_to_do: "list to do".to_string(),
            weather: "weather in".to_string(),
            send_email: "send email".to_string(),
            set_reminder: "remind me".to_string(),
            smart_home: "turn on".to_string(),
        }
    }
}

/// Removes every occurrence of the trigger phrase and trims what is left.
pub fn extract_payload(utterance: &str, trigger: &str) -> String {
    if trigger.is_empty() {
        return utterance.trim().to_string();
    }
    utterance.replace(trigger, "").trim().to_string()
}
