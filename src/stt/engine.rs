//! Core STT engine trait and implementations.
//!
//! # Overview
//!
//! [`SttEngine`] is the public interface used by the consumer loop.  It is
//! object-safe and `Send + Sync` so it can be held behind an `Arc<dyn SttEngine>`.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) is a zero-dependency stub
//! that returns a pre-configured response — useful for unit-testing the
//! pipeline loops without a real GGML model file.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::audio::resample::resample;
use crate::stt::transcribe::{
    SamplingStrategy, Segment, TranscribeParams, TranscriptionResult,
};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// The supplied chunk is shorter than the minimum 0.5 s.
    #[error("Audio too short — minimum 0.5 s")]
    AudioTooShort,

    /// The supplied chunk exceeds the maximum 120 s.
    #[error("Audio too long — maximum 120 s")]
    AudioTooLong,
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// Implementations must be `Send + Sync` so that they can be held behind an
/// `Arc<dyn SttEngine>` and called from any thread.
///
/// # Contract
///
/// - `audio` must be **mono f32** PCM at `sample_rate` Hz (`sample_rate > 0`);
///   the engine performs any internal rate conversion itself.
/// - Returns `Err(SttError::AudioTooShort)` for chunks under 0.5 s.
/// - Returns `Err(SttError::AudioTooLong)` for chunks over 120 s.
pub trait SttEngine: Send + Sync {
    /// Transcribe `audio` and return the transcript plus the detected
    /// language.
    fn transcribe(&self, audio: &[f32], sample_rate: u32)
        -> Result<TranscriptionResult, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// Chunk length bounds
// ---------------------------------------------------------------------------

/// Minimum chunk duration accepted by the engines.
const MIN_CHUNK_SECS: f64 = 0.5;
/// Maximum chunk duration accepted by the engines.
const MAX_CHUNK_SECS: f64 = 120.0;

/// Sample rate Whisper inference runs at; input is resampled to this.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

fn check_chunk_bounds(audio: &[f32], sample_rate: u32) -> Result<(), SttError> {
    if sample_rate == 0 {
        return Err(SttError::Transcription("sample rate must be non-zero".into()));
    }
    let secs = audio.len() as f64 / f64::from(sample_rate);
    if secs < MIN_CHUNK_SECS {
        return Err(SttError::AudioTooShort);
    }
    if secs > MAX_CHUNK_SECS {
        return Err(SttError::AudioTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine that wraps a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created for every [`transcribe`] call so the
/// engine can be shared across threads without any locking.
///
/// [`transcribe`]: SttEngine::transcribe
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send` and `unsafe impl Sync` in whisper-rs — the model
// weights are read-only after loading.  `TranscribeParams` is fully owned
// and trivially Send+Sync.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::ContextInit`]  — whisper-rs failed to load the file.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: TranscribeParams,
    ) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx_params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }

    /// Transcribe `audio` (mono, `sample_rate` Hz) with full segment and
    /// language information.
    pub fn transcribe_full(
        &self,
        audio: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, SttError> {
        check_chunk_bounds(audio, sample_rate)?;

        // Whisper wants 16 kHz; the shared buffer holds the capture rate.
        let audio = resample(audio, sample_rate, WHISPER_SAMPLE_RATE);

        // ── Build FullParams ──────────────────────────────────────────────
        // Convert our SamplingStrategy → whisper-rs's SamplingStrategy.
        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch { beam_size, patience } => {
                WS::BeamSearch { beam_size, patience }
            }
        };

        let mut fp = FullParams::new(ws);

        // set_language takes an Option<&str> whose lifetime is tied to fp.
        // Both `fp` and the borrow of `self.params.language` remain alive
        // until state.full() returns, so the borrow is valid.
        let auto_detect = self.params.language == "auto";
        let lang: Option<&str> = if auto_detect {
            None
        } else {
            Some(self.params.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }

        // ── Create per-call state and run inference ───────────────────────
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let wall_start = std::time::Instant::now();

        state
            .full(fp, &audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        // ── Detected language ─────────────────────────────────────────────
        let language = if auto_detect {
            state
                .full_lang_id()
                .ok()
                .and_then(whisper_rs::get_lang_str)
                .map(str::to_string)
        } else {
            Some(self.params.language.clone())
        };

        // ── Collect segments ──────────────────────────────────────────────
        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        let mut segments: Vec<Segment> = Vec::with_capacity(n_segments as usize);

        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds → multiply by 10 for ms.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            text.push_str(&seg_text);
            segments.push(Segment {
                text: seg_text,
                start_ms: t0,
                end_ms: t1,
            });
        }

        Ok(TranscriptionResult {
            text: text.trim().to_string(),
            language,
            segments,
            duration_ms: wall_start.elapsed().as_millis(),
        })
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, SttError> {
        self.transcribe_full(audio, sample_rate)
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without loading any
/// model file.
///
/// # Example
///
/// ```rust
/// # use livescribe::stt::{SttEngine, MockSttEngine};
/// let engine = MockSttEngine::ok("hello world");
/// let result = engine.transcribe(&vec![0.0f32; 44_100], 44_100).unwrap();
/// assert_eq!(result.text, "hello world");
/// ```
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<TranscriptionResult, SttError>,
}

#[cfg(test)]
impl MockSttEngine {
    /// Create a mock that always succeeds with `text` (language `"en"`).
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(TranscriptionResult {
                text: text.into(),
                language: Some("en".into()),
                segments: Vec::new(),
                duration_ms: 0,
            }),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult, SttError> {
        // Enforce the chunk-length contract even in the mock so that callers
        // are tested against it.
        check_chunk_bounds(audio, sample_rate)?;
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
