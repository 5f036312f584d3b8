use anyhow::Context;
use ramu::assistant::Assistant;
use ramu::backends::espeak::EspeakBackend;
use ramu::backends::microphone::MicrophoneRecognizer;
use ramu::backends::whisper::WhisperBackend;
use ramu::backends::ListenWindow;
use ramu::config_loader::Settings;
use ramu::ear::Ear;
use ramu::engine::{AudioEngine, AudioOutput};
use ramu::handlers::{Collaborators, Dispatcher};
use ramu::services::jokes::BuiltinJokes;
use ramu::services::mail::SmtpMailer;
use ramu::services::media::YoutubePlayer;
use ramu::services::todo::FileTodoStore;
use ramu::services::weather::WeatherApiClient;
use ramu::services::wikipedia::WikipediaClient;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Arc::new(Settings::load().context("Failed to load configuration")?);
    tracing::info!("Configuration loaded, wake word '{}'", settings.wake_word);

    let output: Arc<dyn AudioOutput> =
        Arc::new(AudioEngine::new(Box::new(EspeakBackend::new(&settings.tts_binary))));

    let whisper = WhisperBackend::new(&settings.whisper_model_path, &settings.whisper_language);
    let recognizer = Arc::new(MicrophoneRecognizer::new(
        whisper,
        settings.vad_speech_threshold,
    ));
    let window = ListenWindow {
        timeout: settings.listen_timeout(),
        phrase_limit: settings.phrase_time_limit(),
    };
    let ear = Arc::new(Ear::new(
        recognizer,
        output.clone(),
        &settings.wake_word,
        window,
    ));

    let services = Collaborators {
        output: output.clone(),
        weather: Arc::new(WeatherApiClient::new(&settings.weather_url)),
        encyclopedia: Arc::new(WikipediaClient::new(&settings.wikipedia_url)),
        media: Arc::new(YoutubePlayer::new(&settings.youtube_url)),
        jokes: Arc::new(BuiltinJokes),
        mailer: Arc::new(SmtpMailer::new(
            &settings.smtp_host,
            settings.smtp_port,
            settings.email_credentials(),
        )),
        todo: Arc::new(FileTodoStore::new(&settings.todo_path)),
    };

    let dispatcher = Dispatcher::new(settings.clone(), ear.clone(), services);
    let assistant = Assistant::new(ear, dispatcher, output, settings.recovery_delay());

    tracing::info!("Ramu is listening");
    assistant.run().await;
    Ok(())
}
