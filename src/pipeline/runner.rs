//! Pipeline loops — live capture → shared buffer → chunked transcription.
//!
//! [`Pipeline::spawn`] starts the two long-running threads and hands back
//! their join handles; `main` is the control thread that requests shutdown
//! and then [`join`](Pipeline::join)s both.
//!
//! # Pipeline flow
//!
//! ```text
//! capture thread                      transcribe thread
//! ──────────────                      ─────────────────
//! loop {                              while let Some(chunk) =
//!   shutdown? → break                     buffer.wait_chunk(&policy) {
//!   source.next_block()  (≤ poll)        engine.transcribe(chunk)
//!   buffer.append(block) → broadcast      → stdout / log
//! }                                   }
//! source.close()  (exactly once)      // None = shutdown → exit
//! ```
//!
//! The buffer lock is never held across the source poll or the engine call —
//! a slow transcription can never stall capture, and a stalled source can
//! never starve a drain that is already eligible.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::{ChunkPolicy, SampleSource, SharedAudioBuffer};
use crate::stt::SttEngine;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Handles to the two running loops.
///
/// Dropping a `Pipeline` without calling [`join`](Pipeline::join) detaches
/// the threads; the intended lifecycle is `spawn` → `request_shutdown` on the
/// shared buffer → `join`.
pub struct Pipeline {
    capture: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

impl Pipeline {
    /// Spawn the capture and transcription threads.
    ///
    /// `source` is owned exclusively by the capture thread, `engine` by the
    /// transcription thread; `buffer` (with its embedded shutdown flag) is
    /// the only state shared between them.
    ///
    /// # Errors
    ///
    /// Returns the OS error when a thread could not be spawned.
    pub fn spawn(
        source: Box<dyn SampleSource>,
        engine: Arc<dyn SttEngine>,
        buffer: Arc<SharedAudioBuffer>,
        policy: ChunkPolicy,
    ) -> std::io::Result<Self> {
        let capture = thread::Builder::new().name("capture".into()).spawn({
            let buffer = Arc::clone(&buffer);
            move || capture_loop(source, &buffer)
        })?;

        let consumer = thread::Builder::new()
            .name("transcribe".into())
            .spawn(move || consumer_loop(&buffer, policy, engine.as_ref()))?;

        Ok(Self { capture, consumer })
    }

    /// Wait for both loops to exit.
    ///
    /// Call after `request_shutdown`; an in-flight transcription is allowed
    /// to finish, so this blocks until the current chunk (if any) is done.
    pub fn join(self) {
        if self.capture.join().is_err() {
            log::error!("capture thread panicked");
        }
        if self.consumer.join().is_err() {
            log::error!("transcribe thread panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// Capture loop
// ---------------------------------------------------------------------------

/// Bridge the sample source into the shared buffer until shutdown.
///
/// Each iteration checks the shutdown flag, then polls the source for at
/// most its poll interval — so a shutdown request is observed within one
/// poll cycle, after the in-flight poll completes.  A session error ends
/// the loop (it is logged, not retried); the consumer keeps draining
/// whatever remains buffered.
fn capture_loop(mut source: Box<dyn SampleSource>, buffer: &SharedAudioBuffer) {
    loop {
        if buffer.shutdown_requested() {
            log::debug!("capture: shutdown requested, exiting");
            break;
        }

        match source.next_block() {
            // An idle poll yields an empty block; appending it still
            // broadcasts, so waiters recheck at least once per cycle.
            Ok(block) => buffer.append(&block.samples),
            Err(e) => {
                log::error!("capture: session error: {e}");
                break;
            }
        }
    }

    // Release the session exactly once; "already disconnected" is a
    // harmless no-op.
    match source.close() {
        Ok(()) => log::debug!("capture: session closed"),
        Err(e) => log::debug!("capture: close: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

/// Drain threshold-sized chunks and hand them to the engine until shutdown.
///
/// `wait_chunk` blocks inside the buffer's condition wait; when it returns
/// `None` shutdown was requested and any below-threshold remainder is
/// intentionally left undrained.  The engine call runs without the buffer
/// lock, and a failed chunk is reported and dropped — never retried — so one
/// bad chunk cannot take the loop down.
fn consumer_loop(buffer: &SharedAudioBuffer, policy: ChunkPolicy, engine: &dyn SttEngine) {
    log::info!("recording...");

    while let Some(chunk) = buffer.wait_chunk(&policy) {
        let secs = chunk.len() as f32 / policy.sample_rate as f32;
        log::info!("transcribing {secs:.1} s chunk");

        match engine.transcribe(&chunk, policy.sample_rate) {
            Ok(result) => {
                if let Some(lang) = &result.language {
                    log::info!("detected language: {lang}");
                }
                println!("{}", result.text);
            }
            Err(e) => {
                log::error!("transcription failed: {e}");
            }
        }

        log::info!("recording...");
    }

    log::debug!("transcribe: shutdown requested, exiting");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
