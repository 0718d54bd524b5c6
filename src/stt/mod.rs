//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SttEngine (trait)                    │
//! │                                                      │
//! │   ┌─────────────┐    ┌──────────────┐               │
//! │   │  ModelPaths  │    │ WhisperEngine│               │
//! │   │ - resolve    │───▶│ - ctx        │               │
//! │   │ - exists?    │    │ - params     │               │
//! │   └─────────────┘    └──────┬───────┘               │
//! │                              │                       │
//! │                              ▼                       │
//! │                    ┌──────────────────┐              │
//! │                    │  transcribe()    │              │
//! │                    │  audio → text    │              │
//! │                    │        + language│              │
//! │                    └──────────────────┘              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use livescribe::stt::{WhisperEngine, TranscribeParams, SttEngine};
//!
//! let params = TranscribeParams::default(); // language = "auto", Greedy { best_of: 1 }
//! let engine = WhisperEngine::load("models/ggml-whisper-medium.bin", params)
//!     .expect("model file missing");
//!
//! // chunk: mono f32 PCM from the shared buffer, at the capture rate
//! let chunk: Vec<f32> = vec![0.0; 44_100 * 5]; // 5 s of silence
//! let result = engine.transcribe(&chunk, 44_100).unwrap();
//! println!("[{}] {}", result.language.as_deref().unwrap_or("??"), result.text);
//! ```

pub mod engine;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use transcribe::{SamplingStrategy, Segment, TranscribeParams, TranscriptionResult};

// test-only re-export so the pipeline test module can import MockSttEngine
// without `use livescribe::stt::engine::MockSttEngine`.
#[cfg(test)]
pub use engine::MockSttEngine;
