//! Application entry point — livescribe.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Resolve and load the Whisper model (fatal when missing).
//! 4. Connect the cpal capture source — a connection failure is fatal and
//!    the process exits non-zero before any loop starts.
//! 5. Spawn the capture and transcribe threads ([`Pipeline::spawn`]).
//! 6. Block on Ctrl-C (small current-thread tokio runtime).
//! 7. Request shutdown, join both threads, exit 0.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use livescribe::{
    audio::{ChunkPolicy, CpalSource, SharedAudioBuffer},
    config::{AppConfig, AppPaths},
    pipeline::Pipeline,
    stt::{find_model_by_id, ModelPaths, SttEngine, TranscribeParams, WhisperEngine},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("livescribe starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Whisper model
    let paths = AppPaths::new();
    let model = find_model_by_id(&config.stt.model)
        .with_context(|| format!("unknown model id {:?}", config.stt.model))?;
    let model_path = ModelPaths::from_app_paths(&paths).model_path(model);

    log::info!("loading {}...", model.display_name);
    let params = TranscribeParams {
        language: config.stt.language.clone(),
        ..TranscribeParams::default()
    };
    let engine: Arc<dyn SttEngine> = Arc::new(
        WhisperEngine::load(&model_path, params)
            .with_context(|| format!("failed to load model {}", model_path.display()))?,
    );
    log::info!("load completed");

    // 4. Capture source — LIVESCRIBE_SOURCE overrides the configured device.
    let device = std::env::var("LIVESCRIBE_SOURCE")
        .ok()
        .or_else(|| config.audio.device.clone());

    let source = CpalSource::connect(
        device.as_deref(),
        config.audio.sample_rate,
        Duration::from_millis(config.audio.poll_interval_ms),
    )
    .context("failed to connect to the audio source")?;

    log::info!(
        "capturing from {} ({} Hz native, {} ch) at {} Hz mono",
        device.as_deref().unwrap_or("default device"),
        source.native_rate(),
        source.channels(),
        config.audio.sample_rate
    );

    // 5. Pipeline threads
    let buffer = Arc::new(SharedAudioBuffer::new());
    let policy = ChunkPolicy::new(
        config.audio.sample_rate,
        config.audio.min_chunk_secs,
        config.audio.max_chunk_secs,
    );

    let pipeline = Pipeline::spawn(Box::new(source), engine, Arc::clone(&buffer), policy)
        .context("failed to spawn pipeline threads")?;

    // 6. Wait for Ctrl-C; the pipeline threads do all the work meanwhile.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    rt.block_on(tokio::signal::ctrl_c())
        .context("failed to wait for interrupt signal")?;

    // 7. Cooperative shutdown: both loops observe the flag within one
    //    poll/wait cycle; an in-flight transcription is allowed to finish.
    log::info!("interrupt received, shutting down");
    buffer.request_shutdown();
    pipeline.join();

    log::info!("clean shutdown complete");
    Ok(())
}
