//! Pipeline module — wires capture, the shared buffer, and transcription.
//!
//! # Architecture
//!
//! ```text
//! CpalSource ──next_block──▶ capture thread
//!                                │ append + broadcast
//!                                ▼
//!                        SharedAudioBuffer (one mutex + condvar,
//!                                │          samples + shutdown flag)
//!                                │ wait_chunk (predicate recheck loop)
//!                                ▼
//!                          transcribe thread ──▶ SttEngine ──▶ stdout
//!
//! main ──Ctrl-C──▶ request_shutdown ──broadcast──▶ both threads exit
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use livescribe::audio::{ChunkPolicy, CpalSource, SharedAudioBuffer};
//! use livescribe::pipeline::Pipeline;
//! use livescribe::stt::{SttEngine, TranscribeParams, WhisperEngine};
//!
//! let source = CpalSource::connect(None, 44_100, Duration::from_millis(100)).unwrap();
//! let engine: Arc<dyn SttEngine> = Arc::new(
//!     WhisperEngine::load("models/ggml-whisper-medium.bin", TranscribeParams::default())
//!         .unwrap(),
//! );
//! let buffer = Arc::new(SharedAudioBuffer::new());
//! let policy = ChunkPolicy::new(44_100, 5.0, 10.0);
//!
//! let pipeline = Pipeline::spawn(Box::new(source), engine, Arc::clone(&buffer), policy)
//!     .unwrap();
//!
//! // ... later, from the control thread:
//! buffer.request_shutdown();
//! pipeline.join();
//! ```

pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::Pipeline;
