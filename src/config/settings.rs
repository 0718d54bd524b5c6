//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and chunk accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Fixed capture sample rate in Hz; all buffered audio is mono at this
    /// rate.
    pub sample_rate: u32,
    /// Input device name — `None` means the system default.  Overridden by
    /// the `LIVESCRIBE_SOURCE` environment variable when set.
    pub device: Option<String>,
    /// Upper bound in milliseconds on a single capture poll, which is also
    /// the worst-case shutdown latency of the capture loop.
    pub poll_interval_ms: u64,
    /// Minimum buffered duration in seconds before a chunk is handed to the
    /// transcription engine.
    pub min_chunk_secs: f32,
    /// Maximum duration in seconds of a single transcription chunk; excess
    /// audio stays buffered for the next cycle.
    pub max_chunk_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            device: None,
            poll_interval_ms: 100,
            min_chunk_secs: 5.0,
            max_chunk_secs: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Model id from the registry (e.g. `"whisper-medium"`); resolved to a
    /// GGML file under the models directory.
    pub model: String,
    /// Speech language as an ISO-639-1 code, or `"auto"` for Whisper's
    /// built-in per-chunk language detection.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-medium".into(),
            language: "auto".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use livescribe::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio capture / chunking settings.
    pub audio: AudioConfig,
    /// STT engine settings.
    pub stt: SttConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // AudioConfig
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.device, loaded.audio.device);
        assert_eq!(original.audio.poll_interval_ms, loaded.audio.poll_interval_ms);
        assert_eq!(original.audio.min_chunk_secs, loaded.audio.min_chunk_secs);
        assert_eq!(original.audio.max_chunk_secs, loaded.audio.max_chunk_secs);

        // SttConfig
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.stt.language, loaded.stt.language);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
        assert_eq!(config.stt.model, default.stt.model);
        assert_eq!(config.stt.language, default.stt.language);
    }

    /// Verify default values match the documented chunking policy.
    #[test]
    fn default_values_match_policy() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert!(cfg.audio.device.is_none());
        assert_eq!(cfg.audio.poll_interval_ms, 100);
        assert_eq!(cfg.audio.min_chunk_secs, 5.0);
        assert_eq!(cfg.audio.max_chunk_secs, 10.0);
        assert_eq!(cfg.stt.model, "whisper-medium");
        assert_eq!(cfg.stt.language, "auto");
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.audio.sample_rate = 48_000;
        cfg.audio.device = Some("USB Microphone".into());
        cfg.audio.poll_interval_ms = 250;
        cfg.audio.min_chunk_secs = 3.0;
        cfg.audio.max_chunk_secs = 15.0;
        cfg.stt.model = "whisper-large-v3".into();
        cfg.stt.language = "en".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.audio.sample_rate, 48_000);
        assert_eq!(loaded.audio.device.as_deref(), Some("USB Microphone"));
        assert_eq!(loaded.audio.poll_interval_ms, 250);
        assert_eq!(loaded.audio.min_chunk_secs, 3.0);
        assert_eq!(loaded.audio.max_chunk_secs, 15.0);
        assert_eq!(loaded.stt.model, "whisper-large-v3");
        assert_eq!(loaded.stt.language, "en");
    }
}
