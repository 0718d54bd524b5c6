//! Audio pipeline — live capture → mono/rate conversion → shared buffer.
//!
//! # Pipeline
//!
//! ```text
//! Input device → cpal callback → CpalSource::next_block (poll, ≤100 ms)
//!             → stereo_to_mono → resample → SampleBlock
//!             → SharedAudioBuffer::append (capture loop)
//!             → SharedAudioBuffer::wait_chunk (consumer loop)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use livescribe::audio::{CpalSource, SampleSource};
//!
//! let mut source = CpalSource::connect(None, 44_100, Duration::from_millis(100)).unwrap();
//! let block = source.next_block().unwrap(); // empty when the poll expired
//! println!("got {} samples", block.len());
//! ```

pub mod buffer;
pub mod capture;
pub mod resample;

pub use buffer::{ChunkPolicy, SharedAudioBuffer};
pub use capture::{CaptureError, CpalSource, SampleBlock, SampleSource, SessionError};
pub use resample::{resample, stereo_to_mono};
