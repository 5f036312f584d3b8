//! Native Whisper backend using whisper.cpp via whisper-rs bindings
//!
//! Turns a recorded WAV file into lowercase-ready command text.

use crate::error::CaptureError;
use deunicode::deunicode;
use regex::Regex;
use std::sync::{Arc, Mutex, OnceLock};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// whisper.cpp expects 16kHz mono input
const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Native Whisper backend for speech-to-text
pub struct WhisperBackend {
    model_path: String,
    language: String,
    /// Model loaded on first use and kept in memory
    ctx: OnceLock<Arc<Mutex<WhisperContext>>>,
}

impl WhisperBackend {
    /// Create a new Whisper backend instance
    pub fn new(model_path: &str, language: &str) -> Self {
        Self {
            model_path: model_path.to_string(),
            language: language.to_string(),
            ctx: OnceLock::new(),
        }
    }

    /// Get or initialize the whisper context (lazy-loaded, stays in memory)
    fn get_or_init_context(&self) -> Result<Arc<Mutex<WhisperContext>>, CaptureError> {
        if let Some(ctx) = self.ctx.get() {
            return Ok(ctx.clone());
        }

        // Expand ~ to home directory
        let expanded_path = match self.model_path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest).to_string_lossy().into_owned())
                .unwrap_or_else(|| self.model_path.clone()),
            None => self.model_path.clone(),
        };

        tracing::info!("Whisper: Loading model from {}...", expanded_path);
        let ctx = WhisperContext::new_with_params(&expanded_path, WhisperContextParameters::default())
            .map_err(|e| {
                CaptureError::ServiceUnavailable(format!("Failed to load Whisper model: {:?}", e))
            })?;
        tracing::info!("Whisper: Model loaded successfully");

        let arc_ctx = Arc::new(Mutex::new(ctx));
        let _ = self.ctx.set(arc_ctx.clone());
        Ok(arc_ctx)
    }

    /// Transcribe audio from a WAV file
    pub fn transcribe(&self, wav_path: &str) -> Result<String, CaptureError> {
        let start = std::time::Instant::now();

        let audio_data = self.load_audio(wav_path)?;
        tracing::debug!(
            "Whisper: Loaded {} samples from {}",
            audio_data.len(),
            wav_path
        );

        let ctx = self.get_or_init_context()?;
        let ctx_guard = ctx
            .lock()
            .map_err(|_| CaptureError::ServiceUnavailable("Whisper context poisoned".into()))?;

        let mut state = ctx_guard
            .create_state()
            .map_err(|e| CaptureError::ServiceUnavailable(format!("Failed to create state: {:?}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // Set language (empty string = auto-detect)
        if !self.language.is_empty() && self.language != "auto" {
            params.set_language(Some(&self.language));
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Commands are short
        params.set_single_segment(true);

        state
            .full(params, &audio_data)
            .map_err(|e| CaptureError::Other(format!("Transcription failed: {:?}", e)))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(segment_text) = segment.to_str() {
                text.push_str(segment_text);
                text.push(' ');
            }
        }

        let result = clean_transcript(&text);
        tracing::debug!("Whisper: Transcribed '{}' in {:?}", result, start.elapsed());
        Ok(result)
    }

    /// Load audio from WAV file and convert to f32 mono 16kHz
    fn load_audio(&self, wav_path: &str) -> Result<Vec<f32>, CaptureError> {
        let reader = hound::WavReader::open(wav_path)
            .map_err(|e| CaptureError::Other(format!("Failed to open WAV: {}", e)))?;

        let spec = reader.spec();
        let channels = spec.channels as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .filter_map(|s| s.ok())
                .collect(),
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 / (1_i64 << (bit_depth - 1)) as f32)
                    .collect()
            }
        };

        let mono: Vec<f32> = if channels > 1 {
            samples
                .chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };

        if spec.sample_rate != WHISPER_SAMPLE_RATE {
            Ok(resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE))
        } else {
            Ok(mono)
        }
    }
}

/// Simple linear interpolation resampling
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx = src_idx as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < input.len() {
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        } else if idx < input.len() {
            input[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

fn noise_markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    // [BLANK_AUDIO], (music), [inaudible] ...
    MARKERS.get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("valid regex"))
}

/// Strips whisper's non-speech markers and sentence punctuation so trigger
/// phrases and payloads compare the way they were spoken.
pub fn clean_transcript(raw: &str) -> String {
    let ascii = deunicode(raw);
    let without_markers = noise_markers().replace_all(&ascii, " ");
    let words: Vec<String> = without_markers
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | ';' | ':' | '"'))
                .to_string()
        })
        .filter(|word| !word.is_empty())
        .collect();
    words.join(" ")
}
