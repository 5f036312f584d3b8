use crate::backends::SpeechBackend;
use crate::error::SpeechError;
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{channel, Sender};
use std::thread;
use tokio::sync::oneshot;

/// Speech output sink shared by the run loop and reminder tasks.
///
/// `speak` resolves once the text has been rendered. Implementations must
/// tolerate concurrent callers.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

struct SpeakRequest {
    text: String,
    done: oneshot::Sender<Result<(), SpeechError>>,
}

/// Speaks through a single audio thread, so requests play one at a time in
/// arrival order.
#[derive(Clone)]
pub struct AudioEngine {
    tx: Sender<SpeakRequest>,
}

impl AudioEngine {
    pub fn new(backend: Box<dyn SpeechBackend>) -> Self {
        let (tx, rx) = channel::<SpeakRequest>();

        thread::spawn(move || {
            // Audio stream must live on this thread
            let output = OutputStream::try_default();
            if let Err(e) = &output {
                tracing::error!("No audio output device found: {}", e);
            }

            while let Ok(request) = rx.recv() {
                let result = match &output {
                    Ok((_stream, handle)) => render(backend.as_ref(), handle, &request.text),
                    Err(_) => Err(SpeechError::NoDevice),
                };
                let _ = request.done.send(result);
            }
        });

        Self { tx }
    }
}

fn render(
    backend: &dyn SpeechBackend,
    handle: &rodio::OutputStreamHandle,
    text: &str,
) -> Result<(), SpeechError> {
    tracing::debug!("Audio Thread: Synthesizing '{}' with {}", text, backend.id());
    let wav = backend.synthesize(text)?;

    let sink = Sink::try_new(handle).map_err(|e| SpeechError::Playback(e.to_string()))?;
    let source = Decoder::new(Cursor::new(wav))
        .map_err(|e| SpeechError::Playback(format!("Failed to decode: {}", e)))?;
    sink.append(source.convert_samples::<f32>());
    // Block until the phrase is heard
    sink.sleep_until_end();
    Ok(())
}

#[async_trait]
impl AudioOutput for AudioEngine {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        tracing::info!("Ramu: {}", text);
        let (done, wait) = oneshot::channel();
        self.tx
            .send(SpeakRequest {
                text: text.to_string(),
                done,
            })
            .map_err(|_| SpeechError::Disconnected)?;
        wait.await.map_err(|_| SpeechError::Disconnected)?
    }
}
