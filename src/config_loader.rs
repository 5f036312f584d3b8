use crate::commands::CommandTable;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration file read when `RAMU_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Value shipped in the example config; treated the same as a missing key.
pub const WEATHER_KEY_PLACEHOLDER: &str = "YOUR_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub commands: CommandTable,
    // Credentials
    pub email_address: Option<String>,
    pub email_password: Option<String>,
    pub weather_api_key: Option<String>,
    // Listening
    pub wake_word: String,
    pub listen_timeout_secs: u64,
    pub phrase_time_limit_secs: u64,
    pub vad_speech_threshold: f32,
    pub whisper_model_path: String,
    pub whisper_language: String,
    // Speaking
    pub tts_binary: String,
    // Run loop
    pub recovery_delay_ms: u64,
    // Collaborators
    pub todo_path: String,
    pub weather_url: String,
    pub wikipedia_url: String,
    pub youtube_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Settings {
    /// Loads `config.json` (or the file named by `RAMU_CONFIG`) merged with
    /// `RAMU_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("RAMU_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::build(
            File::new(&path, FileFormat::Json).required(true),
            Some(
                Environment::with_prefix("RAMU")
                    .prefix_separator("_")
                    .separator("__"),
            ),
        )
    }

    /// Parses settings from an in-memory JSON document, without environment overrides.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::build(File::from_str(json, FileFormat::Json), None)
    }

    fn build<S>(file: S, env: Option<Environment>) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let mut builder = Config::builder()
            .set_default("wake_word", "ramu")?
            .set_default("listen_timeout_secs", 5)?
            .set_default("phrase_time_limit_secs", 5)?
            .set_default("vad_speech_threshold", 0.02)?
            .set_default("whisper_model_path", default_whisper_model())?
            .set_default("whisper_language", "en")?
            .set_default("tts_binary", "espeak-ng")?
            .set_default("recovery_delay_ms", 1000)?
            .set_default("todo_path", "todo_list.txt")?
            .set_default("weather_url", "http://api.weatherapi.com/v1/current.json")?
            .set_default("wikipedia_url", "https://en.wikipedia.org/w/api.php")?
            .set_default("youtube_url", "https://www.youtube.com")?
            .set_default("smtp_host", "smtp.gmail.com")?
            .set_default("smtp_port", 587)?
            .add_source(file);

        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.commands.validate().map_err(ConfigError::Message)?;
        if self.listen_timeout_secs == 0 || self.phrase_time_limit_secs == 0 {
            return Err(ConfigError::Message(
                "listen_timeout_secs and phrase_time_limit_secs must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.vad_speech_threshold) {
            return Err(ConfigError::Message(format!(
                "Invalid vad_speech_threshold: {}. Must be between 0.0 and 1.0",
                self.vad_speech_threshold
            )));
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::Message("smtp_port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Address and password, only when both are present and non-empty.
    pub fn email_credentials(&self) -> Option<(&str, &str)> {
        match (self.email_address.as_deref(), self.email_password.as_deref()) {
            (Some(address), Some(password)) if !address.is_empty() && !password.is_empty() => {
                Some((address, password))
            }
            _ => None,
        }
    }

    /// The weather key, unless it is missing, blank or still the placeholder.
    pub fn weather_key(&self) -> Option<&str> {
        self.weather_api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != WEATHER_KEY_PLACEHOLDER)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn phrase_time_limit(&self) -> Duration {
        Duration::from_secs(self.phrase_time_limit_secs)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

fn default_whisper_model() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache/whisper/ggml-tiny.en.bin")
        .to_string_lossy()
        .into_owned()
}
