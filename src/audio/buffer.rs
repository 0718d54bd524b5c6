//! Shared sample buffer between the capture loop and the consumer loop.
//!
//! [`SharedAudioBuffer`] is an unbounded, append-only-until-drained sequence
//! of mono `f32` samples guarded by a single mutex, plus the shutdown flag
//! and the condition variable both loops synchronise on.  The capture loop
//! appends; the consumer loop blocks in [`wait_chunk`](SharedAudioBuffer::wait_chunk)
//! until at least [`ChunkPolicy::min_samples`] are buffered, then drains a
//! prefix of at most [`ChunkPolicy::max_samples`].
//!
//! Every append and every shutdown request is followed by a `notify_all`, so
//! a waiter may wake before its threshold is met — the wait loop rechecks its
//! predicate on every wake-up.
//!
//! # Example
//!
//! ```rust
//! use livescribe::audio::{ChunkPolicy, SharedAudioBuffer};
//!
//! let buf = SharedAudioBuffer::new();
//! let policy = ChunkPolicy::new(1_000, 1.0, 2.0); // 1 kHz, 1 s min, 2 s max
//!
//! buf.append(&vec![0.0; 1_500]);
//! let chunk = buf.wait_chunk(&policy).unwrap(); // threshold met, no blocking
//! assert_eq!(chunk.len(), 1_500);
//! assert_eq!(buf.len(), 0);
//! ```

use std::sync::{Condvar, Mutex};

// ---------------------------------------------------------------------------
// ChunkPolicy
// ---------------------------------------------------------------------------

/// Duration thresholds governing when and how much the consumer drains.
///
/// Both thresholds are stored in seconds and converted to **integer sample
/// counts** against the fixed capture sample rate — all buffer arithmetic is
/// done in samples, never in float seconds.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    /// Fixed capture sample rate in Hz (e.g. 44 100).
    pub sample_rate: u32,
    /// Minimum buffered duration before a drain is attempted.
    pub min_chunk_secs: f32,
    /// Upper bound on the duration of a single drained chunk.  Samples beyond
    /// this cap stay buffered for the next cycle.
    pub max_chunk_secs: f32,
}

impl ChunkPolicy {
    /// Build a policy from a sample rate and the two duration thresholds.
    pub fn new(sample_rate: u32, min_chunk_secs: f32, max_chunk_secs: f32) -> Self {
        Self {
            sample_rate,
            min_chunk_secs,
            max_chunk_secs,
        }
    }

    /// Minimum number of buffered samples before a drain is attempted.
    pub fn min_samples(&self) -> usize {
        (f64::from(self.sample_rate) * f64::from(self.min_chunk_secs)) as usize
    }

    /// Maximum number of samples returned by a single drain.
    pub fn max_samples(&self) -> usize {
        (f64::from(self.sample_rate) * f64::from(self.max_chunk_secs)) as usize
    }
}

// ---------------------------------------------------------------------------
// SharedAudioBuffer
// ---------------------------------------------------------------------------

/// State behind the single lock: the sample queue and the shutdown flag.
struct BufferState {
    samples: Vec<f32>,
    shutdown: bool,
}

/// Thread-safe accumulation buffer shared by exactly one producer (the
/// capture loop) and one consumer (the transcription loop).
///
/// The shutdown flag lives under the **same** mutex as the samples so that a
/// waiter can observe "shutdown requested" and "threshold met" atomically;
/// the condition variable is associated with that one mutex.  Once set, the
/// flag is never cleared.
pub struct SharedAudioBuffer {
    state: Mutex<BufferState>,
    cond: Condvar,
}

impl SharedAudioBuffer {
    /// Create an empty buffer with the shutdown flag cleared.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                samples: Vec::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Append `block` to the tail and wake all waiters.
    ///
    /// An empty block is legal and still broadcasts — the capture loop calls
    /// this once per poll cycle whether or not the poll delivered samples, so
    /// a waiter is guaranteed to recheck its predicate at least once per
    /// cycle.
    pub fn append(&self, block: &[f32]) {
        {
            let mut state = self.state.lock().unwrap();
            state.samples.extend_from_slice(block);
        }
        self.cond.notify_all();
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().samples.len()
    }

    /// Returns `true` when no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until either the minimum threshold is met or shutdown is
    /// requested, then drain and return a chunk.
    ///
    /// Returns `None` when shutdown has been requested — checked before
    /// waiting and on every wake-up, and it wins even when the threshold is
    /// also met.  Any samples still buffered at that point are left behind
    /// (and discarded with the buffer), never flushed.
    ///
    /// On `Some(chunk)`, the chunk holds `min(max_samples, buffered)` samples
    /// drained from the front — at least `min_samples`, never more than
    /// `max_samples`.  Excess samples stay buffered for the next cycle.
    pub fn wait_chunk(&self, policy: &ChunkPolicy) -> Option<Vec<f32>> {
        let mut state = self.state.lock().unwrap();

        // Signals are broadcast on every append, so a wake-up does not imply
        // the threshold is met — recheck the predicate each time.
        while !state.shutdown && state.samples.len() < policy.min_samples() {
            state = self.cond.wait(state).unwrap();
        }

        if state.shutdown {
            return None;
        }

        let n = policy.max_samples().min(state.samples.len());
        Some(state.samples.drain(..n).collect())
    }

    /// Request cooperative shutdown of both loops.
    ///
    /// Idempotent; safe to call from a signal handler context concurrently
    /// with either loop in any state.  Wakes all waiters so the consumer
    /// observes the flag immediately; the capture loop observes it at its
    /// next poll-cycle check.
    pub fn request_shutdown(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.shutdown = true;
        }
        self.cond.notify_all();
    }

    /// Returns `true` once shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}

impl Default for SharedAudioBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// 1 kHz keeps the sample counts small: min 5 s = 5 000, max 10 s = 10 000.
    fn test_policy() -> ChunkPolicy {
        ChunkPolicy::new(1_000, 5.0, 10.0)
    }

    fn sequential(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    // ---- ChunkPolicy --------------------------------------------------------

    #[test]
    fn policy_converts_durations_to_integer_sample_counts() {
        let policy = ChunkPolicy::new(44_100, 5.0, 10.0);
        assert_eq!(policy.min_samples(), 220_500);
        assert_eq!(policy.max_samples(), 441_000);
    }

    #[test]
    fn policy_fractional_seconds_truncate() {
        let policy = ChunkPolicy::new(1_000, 0.0015, 1.0);
        assert_eq!(policy.min_samples(), 1);
    }

    // ---- Accounting ---------------------------------------------------------

    #[test]
    fn append_accumulates_length() {
        let buf = SharedAudioBuffer::new();
        buf.append(&[0.0; 300]);
        buf.append(&[0.0; 200]);
        assert_eq!(buf.len(), 500);
    }

    #[test]
    fn empty_append_is_a_noop_on_length() {
        let buf = SharedAudioBuffer::new();
        buf.append(&[]);
        assert!(buf.is_empty());
    }

    #[test]
    fn accounting_is_exact_across_appends_and_drains() {
        let buf = SharedAudioBuffer::new();
        let policy = test_policy();

        buf.append(&sequential(0, 7_000));
        buf.append(&sequential(7_000, 6_000)); // 13 000 buffered

        let chunk = buf.wait_chunk(&policy).unwrap();
        assert_eq!(chunk.len(), 10_000); // capped at max_samples
        assert_eq!(buf.len(), 3_000); // 13 000 − 10 000

        buf.append(&sequential(13_000, 4_000)); // back above threshold
        let chunk = buf.wait_chunk(&policy).unwrap();
        assert_eq!(chunk.len(), 7_000); // everything available, under the cap
        assert!(buf.is_empty());
    }

    // ---- Drain bounds -------------------------------------------------------

    #[test]
    fn drain_is_capped_and_excess_remains() {
        // 12 s buffered with a 10 s cap: exactly 10 s drained, 2 s left.
        let buf = SharedAudioBuffer::new();
        let policy = test_policy();

        buf.append(&sequential(0, 12_000));
        let chunk = buf.wait_chunk(&policy).unwrap();

        assert_eq!(chunk.len(), 10_000);
        assert_eq!(buf.len(), 2_000);
        assert_eq!(chunk[0], 0.0);
        assert_eq!(chunk[9_999], 9_999.0);
    }

    #[test]
    fn remainder_keeps_fifo_order_across_cycles() {
        let buf = SharedAudioBuffer::new();
        let policy = test_policy();

        buf.append(&sequential(0, 12_000));
        let first = buf.wait_chunk(&policy).unwrap();
        assert_eq!(first, sequential(0, 10_000));

        buf.append(&sequential(12_000, 8_000)); // 2 000 old + 8 000 new
        let second = buf.wait_chunk(&policy).unwrap();
        assert_eq!(second, sequential(10_000, 10_000));
    }

    #[test]
    fn exact_threshold_drains_everything() {
        let buf = SharedAudioBuffer::new();
        let policy = test_policy();

        buf.append(&sequential(0, 5_000));
        let chunk = buf.wait_chunk(&policy).unwrap();
        assert_eq!(chunk.len(), 5_000);
        assert!(buf.is_empty());
    }

    // ---- Waiting ------------------------------------------------------------

    /// Below-threshold appends must not release a waiter, no matter how many
    /// broadcasts they trigger; crossing the threshold must.
    #[test]
    fn waiter_ignores_signals_below_threshold() {
        let buf = Arc::new(SharedAudioBuffer::new());
        let policy = test_policy();
        let (tx, rx) = mpsc::channel();

        let waiter = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let chunk = buf.wait_chunk(&policy);
                tx.send(chunk).unwrap();
            })
        };

        // Three appends totalling 3 000 samples — three broadcasts, all below
        // the 5 000-sample threshold.  The waiter can only return once the
        // predicate holds, so this recv must time out.
        for _ in 0..3 {
            buf.append(&[0.0; 1_000]);
        }
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        // Crossing the threshold releases it.
        buf.append(&[0.0; 2_500]);
        let chunk = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("waiter should be released")
            .expect("not a shutdown");
        assert_eq!(chunk.len(), 5_500);

        waiter.join().unwrap();
    }

    #[test]
    fn shutdown_releases_waiter_without_draining() {
        // 3 s buffered, below the 5 s threshold: shutdown must wake the
        // waiter, return None, and leave the 3 s undrained.
        let buf = Arc::new(SharedAudioBuffer::new());
        let policy = test_policy();
        buf.append(&[0.0; 3_000]);

        let waiter = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || buf.wait_chunk(&policy))
        };

        // Give the waiter a moment to block, then request shutdown.
        thread::sleep(Duration::from_millis(50));
        buf.request_shutdown();

        assert!(waiter.join().unwrap().is_none());
        assert_eq!(buf.len(), 3_000);
    }

    #[test]
    fn shutdown_before_wait_returns_none_immediately() {
        let buf = SharedAudioBuffer::new();
        buf.request_shutdown();
        assert!(buf.wait_chunk(&test_policy()).is_none());
    }

    #[test]
    fn shutdown_wins_even_when_threshold_is_met() {
        let buf = SharedAudioBuffer::new();
        buf.append(&[0.0; 8_000]);
        buf.request_shutdown();

        assert!(buf.wait_chunk(&test_policy()).is_none());
        assert_eq!(buf.len(), 8_000); // nothing drained
    }

    // ---- Shutdown idempotence ----------------------------------------------

    #[test]
    fn request_shutdown_is_idempotent() {
        let buf = SharedAudioBuffer::new();
        buf.request_shutdown();
        buf.request_shutdown();

        assert!(buf.shutdown_requested());
        assert!(buf.wait_chunk(&test_policy()).is_none());
    }

    #[test]
    fn shutdown_flag_is_terminal() {
        let buf = SharedAudioBuffer::new();
        buf.request_shutdown();
        buf.append(&[0.0; 10_000]); // appends after shutdown don't clear it
        assert!(buf.shutdown_requested());
    }

    // ---- Concurrent append / drain -----------------------------------------

    /// Interleaved appends and drains must preserve the original append order
    /// with no sample lost or duplicated.
    #[test]
    fn concurrent_append_and_drain_preserve_order() {
        const BLOCKS: usize = 100;
        const BLOCK_LEN: usize = 100;
        const TOTAL: usize = BLOCKS * BLOCK_LEN;

        let buf = Arc::new(SharedAudioBuffer::new());
        // 1-sample threshold so the drainer never starves; small cap forces
        // many interleaved drains.
        let policy = ChunkPolicy::new(1_000, 0.001, 0.25);

        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                for b in 0..BLOCKS {
                    buf.append(&sequential(b * BLOCK_LEN, BLOCK_LEN));
                }
            })
        };

        let mut collected = Vec::with_capacity(TOTAL);
        while collected.len() < TOTAL {
            let chunk = buf.wait_chunk(&policy).expect("no shutdown requested");
            collected.extend(chunk);
        }
        producer.join().unwrap();

        assert_eq!(collected.len(), TOTAL);
        for (i, &s) in collected.iter().enumerate() {
            assert_eq!(s, i as f32, "sample {i} out of order");
        }
        assert!(buf.is_empty());
    }
}
