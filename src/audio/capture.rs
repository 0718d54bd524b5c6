//! Live audio capture via `cpal`.
//!
//! [`SampleSource`] is the polling façade the capture loop drives: each
//! [`next_block`](SampleSource::next_block) call blocks for at most the poll
//! interval and yields a mono [`SampleBlock`] at the configured rate (empty
//! when the interval expired with no data).  [`CpalSource`] is the production
//! implementation; it owns a dedicated stream thread because `cpal::Stream`
//! is not `Send` and the capture loop runs on its own thread.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::resample::{resample, stereo_to_mono};

// ---------------------------------------------------------------------------
// SampleBlock
// ---------------------------------------------------------------------------

/// A contiguous run of mono `f32` samples at the configured capture rate.
///
/// Immutable once produced by a [`SampleSource`].  An empty block is legal
/// and means "the poll interval expired with no new audio".
#[derive(Debug, Clone, Default)]
pub struct SampleBlock {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
}

impl SampleBlock {
    /// Wrap an owned sample vector.
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// A block carrying no samples (idle poll cycle).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of samples in this block.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when the block carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of this block in seconds at `sample_rate` Hz.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors while establishing the capture session.  All of these are fatal at
/// startup — the process exits before either loop is spawned.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device \"{0}\" not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn capture stream thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("capture stream thread terminated during initialisation")]
    ThreadInit,
}

/// Errors from an established capture session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session ended: the stream thread went away, or the session was
    /// already closed.  The capture loop exits on this; a redundant `close`
    /// reporting it is a non-fatal no-op.
    #[error("capture session disconnected")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// SampleSource
// ---------------------------------------------------------------------------

/// Blocking, polling view of a live audio source.
///
/// Whether the backend uses callbacks, polling, or an event loop is hidden
/// behind this trait; the capture loop only ever sees bounded `next_block`
/// calls.  Implementations must be `Send` — the source is owned exclusively
/// by the capture loop's thread.
pub trait SampleSource: Send {
    /// Wait up to the source's poll interval for the next block.
    ///
    /// Returns an empty block when the interval expires with no data, and
    /// `Err(SessionError::Disconnected)` when the session has ended.
    fn next_block(&mut self) -> Result<SampleBlock, SessionError>;

    /// Release the capture session.
    ///
    /// Closing an already-closed session returns
    /// `Err(SessionError::Disconnected)`; callers treat that as a no-op.
    fn close(&mut self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// CpalSource
// ---------------------------------------------------------------------------

/// Production [`SampleSource`] backed by a cpal input stream.
///
/// The cpal stream lives on a dedicated thread (the stream type is not
/// `Send`); raw interleaved frames cross to the consumer side over an mpsc
/// channel, where `next_block` downmixes them to mono and resamples to the
/// configured capture rate.
pub struct CpalSource {
    rx: mpsc::Receiver<Vec<f32>>,
    stop_tx: Option<mpsc::Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
    channels: u16,
    native_rate: u32,
    target_rate: u32,
    poll_interval: Duration,
}

impl CpalSource {
    /// Connect to an input device and start streaming.
    ///
    /// `device` selects an input device by name; `None` uses the system
    /// default.  `target_rate` is the fixed rate all emitted blocks are
    /// resampled to.  `poll_interval` bounds how long each `next_block`
    /// call may block.
    ///
    /// # Errors
    ///
    /// Any [`CaptureError`] — the stream could not be established.  These
    /// are connection-time failures; nothing has been spawned into the
    /// pipeline yet.
    pub fn connect(
        device: Option<&str>,
        target_rate: u32,
        poll_interval: Duration,
    ) -> Result<Self, CaptureError> {
        let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>();
        let (init_tx, init_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let selector = device.map(str::to_owned);
        let handle = thread::Builder::new()
            .name("cpal-stream".into())
            .spawn(move || stream_thread(selector, sample_tx, init_tx, stop_rx))?;

        // Block until the stream thread reports whether the stream came up.
        let (channels, native_rate) = init_rx
            .recv()
            .map_err(|_| CaptureError::ThreadInit)??;

        Ok(Self {
            rx: sample_rx,
            stop_tx: Some(stop_tx),
            stream_thread: Some(handle),
            channels,
            native_rate,
            target_rate,
            poll_interval,
        })
    }

    /// Native sample rate reported by the device (Hz).
    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Number of interleaved channels delivered by the device.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl SampleSource for CpalSource {
    fn next_block(&mut self) -> Result<SampleBlock, SessionError> {
        match self.rx.recv_timeout(self.poll_interval) {
            Ok(raw) => {
                let mono = stereo_to_mono(&raw, self.channels);
                let samples = resample(&mono, self.native_rate, self.target_rate);
                Ok(SampleBlock::new(samples))
            }
            Err(RecvTimeoutError::Timeout) => Ok(SampleBlock::empty()),
            Err(RecvTimeoutError::Disconnected) => Err(SessionError::Disconnected),
        }
    }

    fn close(&mut self) -> Result<(), SessionError> {
        let stop_tx = self.stop_tx.take().ok_or(SessionError::Disconnected)?;
        // The stream thread may already be gone; the join below still
        // collects it either way.
        let _ = stop_tx.send(());
        if let Some(handle) = self.stream_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        if self.stop_tx.is_some() {
            let _ = self.close();
        }
    }
}

// ---------------------------------------------------------------------------
// Stream thread
// ---------------------------------------------------------------------------

/// Owns the cpal stream for its whole lifetime.
///
/// Builds the device and stream, reports the outcome over `init_tx`, then
/// parks on `stop_rx` until the session is closed (or the `CpalSource` is
/// dropped, which disconnects `stop_rx` and unparks it too).
fn stream_thread(
    selector: Option<String>,
    sample_tx: mpsc::Sender<Vec<f32>>,
    init_tx: mpsc::Sender<Result<(u16, u32), CaptureError>>,
    stop_rx: mpsc::Receiver<()>,
) {
    match build_stream(selector.as_deref(), sample_tx) {
        Ok((stream, channels, native_rate)) => {
            if init_tx.send(Ok((channels, native_rate))).is_err() {
                return; // connect() gave up
            }
            let _ = stop_rx.recv();
            drop(stream);
        }
        Err(e) => {
            let _ = init_tx.send(Err(e));
        }
    }
}

/// Resolve the device, build an f32 input stream, and start it.
fn build_stream(
    selector: Option<&str>,
    sample_tx: mpsc::Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u16, u32), CaptureError> {
    let host = cpal::default_host();

    let device = match selector {
        Some(wanted) => {
            let mut found = None;
            for device in host.input_devices()? {
                if device.name().map(|n| n == wanted).unwrap_or(false) {
                    found = Some(device);
                    break;
                }
            }
            found.ok_or_else(|| CaptureError::DeviceNotFound(wanted.to_string()))?
        }
        None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
    };

    let supported = device.default_input_config()?;
    let channels = supported.channels();
    let native_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Ignore send errors; the receiver may have been dropped.
            let _ = sample_tx.send(data.to_vec());
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None, // no timeout
    )?;

    stream.play()?;
    Ok((stream, channels, native_rate))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- SampleBlock -------------------------------------------------------

    #[test]
    fn sample_block_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SampleBlock>();
    }

    #[test]
    fn empty_block_has_zero_duration() {
        let block = SampleBlock::empty();
        assert!(block.is_empty());
        assert_eq!(block.len(), 0);
        assert_eq!(block.duration_secs(44_100), 0.0);
    }

    #[test]
    fn duration_secs_calculation() {
        let block = SampleBlock::new(vec![0.0; 22_050]);
        assert!((block.duration_secs(44_100) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duration_secs_zero_rate_is_zero() {
        let block = SampleBlock::new(vec![0.0; 100]);
        assert_eq!(block.duration_secs(0), 0.0);
    }

    // ---- SampleSource object safety ----------------------------------------

    struct StubSource {
        closed: bool,
    }

    impl SampleSource for StubSource {
        fn next_block(&mut self) -> Result<SampleBlock, SessionError> {
            Ok(SampleBlock::empty())
        }

        fn close(&mut self) -> Result<(), SessionError> {
            if self.closed {
                return Err(SessionError::Disconnected);
            }
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn box_dyn_sample_source_compiles() {
        let mut source: Box<dyn SampleSource> = Box::new(StubSource { closed: false });
        assert!(source.next_block().is_ok());
    }

    #[test]
    fn double_close_reports_already_disconnected() {
        let mut source = StubSource { closed: false };
        assert!(source.close().is_ok());
        assert!(matches!(
            source.close().unwrap_err(),
            SessionError::Disconnected
        ));
    }

    // ---- Error display -----------------------------------------------------

    #[test]
    fn device_not_found_names_the_device() {
        let e = CaptureError::DeviceNotFound("USB Mic".into());
        assert!(e.to_string().contains("USB Mic"));
    }

    #[test]
    fn session_error_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SessionError>();
        assert_send::<CaptureError>();
    }
}
