//! Microphone capture feeding the Whisper backend.
//!
//! One listen calibrates against ambient noise, waits for speech to start,
//! records the phrase, writes it to a WAV file and transcribes it.

use super::whisper::WhisperBackend;
use super::{ListenWindow, SpeechRecognizer};
use crate::error::CaptureError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often the recorder drains the ring buffer.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Noise floor measurement at the start of every listen.
const CALIBRATION: Duration = Duration::from_millis(300);

/// Audio kept from before the speech onset so the first word isn't clipped.
const PRE_ROLL: Duration = Duration::from_millis(300);

/// Trailing silence that ends a phrase early.
const END_OF_PHRASE_SILENCE: Duration = Duration::from_millis(800);

/// Onset threshold relative to the measured ambient level.
const AMBIENT_MULTIPLIER: f32 = 1.5;

/// Samples captured from the default input device.
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// `SpeechRecognizer` backed by the default microphone and whisper.cpp.
pub struct MicrophoneRecognizer {
    whisper: Arc<WhisperBackend>,
    speech_threshold: f32,
    wav_path: PathBuf,
}

impl MicrophoneRecognizer {
    pub fn new(whisper: WhisperBackend, speech_threshold: f32) -> Self {
        Self {
            whisper: Arc::new(whisper),
            speech_threshold,
            wav_path: std::env::temp_dir().join("ramu_capture.wav"),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for MicrophoneRecognizer {
    async fn recognize(&self, window: ListenWindow) -> Result<String, CaptureError> {
        let whisper = self.whisper.clone();
        let threshold = self.speech_threshold;
        let wav_path = self.wav_path.clone();

        tokio::task::spawn_blocking(move || {
            tracing::info!("Listening for your command...");
            let recording = record_phrase(window, threshold)?;
            save_wav(&wav_path, &recording)?;
            let text = whisper.transcribe(&wav_path.to_string_lossy());
            let _ = std::fs::remove_file(&wav_path);
            match text? {
                t if t.trim().is_empty() => Err(CaptureError::Unintelligible),
                t => Ok(t),
            }
        })
        .await
        .map_err(|e| CaptureError::Other(format!("Error joining audio task: {}", e)))?
    }
}

/// Records one phrase from the default input device.
///
/// # Errors
/// * `ServiceUnavailable` - No usable input device or stream.
/// * `Other` - Nobody spoke before `window.timeout` ran out.
pub fn record_phrase(window: ListenWindow, threshold: f32) -> Result<Recording, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::ServiceUnavailable("No input device found".into()))?;

    let default_config = device.default_input_config().map_err(|e| {
        CaptureError::ServiceUnavailable(format!("Error getting input config: {}", e))
    })?;

    let sample_rate = default_config.sample_rate();
    let channels = default_config.channels();
    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    // Two seconds of headroom between the callback and this thread
    let samples_per_sec = sample_rate as usize * channels as usize;
    let (mut producer, mut consumer) = HeapRb::<f32>::new(samples_per_sec * 2).split();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let pushed = producer.push_slice(data);
                if pushed < data.len() {
                    tracing::trace!("capture buffer full, dropped {} samples", data.len() - pushed);
                }
            },
            |err| tracing::warn!("an error occurred on input stream: {}", err),
            None,
        )
        .map_err(|e| CaptureError::ServiceUnavailable(format!("Error building stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| CaptureError::Other(format!("Error starting stream: {}", e)))?;

    let mut detector = PhraseDetector::new(window, threshold, samples_per_sec);
    let mut chunk = vec![0.0f32; samples_per_sec / 10];
    let started = Instant::now();

    let samples = loop {
        thread::sleep(POLL_INTERVAL);
        loop {
            let read = consumer.pop_slice(&mut chunk);
            if read == 0 {
                break;
            }
            detector.feed(&chunk[..read]);
        }
        match detector.poll(started.elapsed()) {
            PhraseState::Pending => continue,
            PhraseState::TimedOut => {
                return Err(CaptureError::Other(
                    "listening timed out while waiting for phrase to start".into(),
                ))
            }
            PhraseState::Done(samples) => break samples,
        }
    };

    drop(stream);
    tracing::debug!(
        "Recorded {} samples at {}Hz x{}",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(Recording {
        samples,
        sample_rate,
        channels,
    })
}

fn save_wav(path: &Path, recording: &Recording) -> Result<(), CaptureError> {
    let spec = hound::WavSpec {
        channels: recording.channels,
        sample_rate: recording.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let to_err = |e: hound::Error| CaptureError::Other(format!("Error saving WAV: {}", e));

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_err)?;
    for &sample in &recording.samples {
        writer.write_sample(sample).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[derive(Debug, PartialEq)]
enum PhraseState {
    Pending,
    TimedOut,
    Done(Vec<f32>),
}

/// Energy-based endpointing over interleaved samples.
struct PhraseDetector {
    window: ListenWindow,
    min_threshold: f32,
    samples_per_sec: usize,
    calibration: Vec<f32>,
    threshold: Option<f32>,
    pre_roll: VecDeque<f32>,
    phrase: Vec<f32>,
    onset: Option<Duration>,
    /// Samples fed since the last loud chunk.
    quiet_samples: usize,
    fed_samples: usize,
}

impl PhraseDetector {
    fn new(window: ListenWindow, min_threshold: f32, samples_per_sec: usize) -> Self {
        Self {
            window,
            min_threshold,
            samples_per_sec: samples_per_sec.max(1),
            calibration: Vec::new(),
            threshold: None,
            pre_roll: VecDeque::new(),
            phrase: Vec::new(),
            onset: None,
            quiet_samples: 0,
            fed_samples: 0,
        }
    }

    fn duration_of(&self, samples: usize) -> Duration {
        Duration::from_secs_f64(samples as f64 / self.samples_per_sec as f64)
    }

    fn samples_in(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.samples_per_sec as f64) as usize
    }

    fn feed(&mut self, chunk: &[f32]) {
        self.fed_samples += chunk.len();

        let threshold = match self.threshold {
            Some(t) => t,
            None => {
                self.calibration.extend_from_slice(chunk);
                if self.calibration.len() >= self.samples_in(CALIBRATION) {
                    let ambient = rms(&self.calibration);
                    let t = (ambient * AMBIENT_MULTIPLIER).max(self.min_threshold);
                    tracing::debug!("ambient level {:.4}, speech threshold {:.4}", ambient, t);
                    self.threshold = Some(t);
                }
                return;
            }
        };

        let loud = rms(chunk) >= threshold;
        if self.onset.is_none() {
            if loud {
                self.onset = Some(self.duration_of(self.fed_samples));
                self.phrase.extend(self.pre_roll.drain(..));
                self.phrase.extend_from_slice(chunk);
            } else {
                self.pre_roll.extend(chunk.iter().copied());
                let keep = self.samples_in(PRE_ROLL);
                while self.pre_roll.len() > keep {
                    self.pre_roll.pop_front();
                }
            }
            return;
        }

        self.phrase.extend_from_slice(chunk);
        if loud {
            self.quiet_samples = 0;
        } else {
            self.quiet_samples += chunk.len();
        }
    }

    fn poll(&mut self, elapsed: Duration) -> PhraseState {
        match self.onset {
            None if elapsed >= self.window.timeout + CALIBRATION => PhraseState::TimedOut,
            None => PhraseState::Pending,
            Some(_) => {
                let phrase_len = self.duration_of(self.phrase.len());
                let silence = self.duration_of(self.quiet_samples);
                if phrase_len >= self.window.phrase_limit || silence >= END_OF_PHRASE_SILENCE {
                    PhraseState::Done(std::mem::take(&mut self.phrase))
                } else {
                    PhraseState::Pending
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: usize = 1000;

    fn window() -> ListenWindow {
        ListenWindow {
            timeout: Duration::from_secs(1),
            phrase_limit: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_times_out_without_speech() {
        let mut detector = PhraseDetector::new(window(), 0.1, RATE);
        detector.feed(&vec![0.0; RATE]);
        assert_eq!(detector.poll(Duration::from_millis(500)), PhraseState::Pending);
        assert_eq!(detector.poll(Duration::from_secs(2)), PhraseState::TimedOut);
    }

    #[test]
    fn test_phrase_ends_after_silence() {
        let mut detector = PhraseDetector::new(window(), 0.1, RATE);
        detector.feed(&vec![0.0; 300]); // calibration
        detector.feed(&vec![0.0; 100]); // pre-roll
        detector.feed(&vec![0.5; 200]); // speech
        assert_eq!(detector.poll(Duration::from_millis(600)), PhraseState::Pending);
        detector.feed(&vec![0.0; 800]);
        match detector.poll(Duration::from_millis(1400)) {
            PhraseState::Done(samples) => assert_eq!(samples.len(), 100 + 200 + 800),
            other => panic!("expected a finished phrase, got {:?}", other),
        }
    }

    #[test]
    fn test_phrase_capped_at_limit() {
        let mut detector = PhraseDetector::new(window(), 0.1, RATE);
        detector.feed(&vec![0.0; 300]);
        for _ in 0..25 {
            detector.feed(&vec![0.5; 100]);
        }
        assert!(matches!(
            detector.poll(Duration::from_secs(3)),
            PhraseState::Done(_)
        ));
    }
}
