//! Model registry, metadata and path resolution.
//!
//! [`WHISPER_MODELS`] lists the standard multilingual Whisper GGML builds
//! the daemon knows how to resolve.  [`ModelPaths`] maps a registry entry to
//! its on-disk location given an [`crate::config::AppPaths`] instance.

use std::path::PathBuf;

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// ModelSize
// ---------------------------------------------------------------------------

/// Approximate capacity tier of a Whisper GGML model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    /// ~244 MB file / ~1 GB RAM — fastest, lowest accuracy.
    Small,
    /// ~769 MB file / ~3 GB RAM — balanced (recommended for live use).
    Medium,
    /// ~1.5 GB file / ~6 GB RAM — highest accuracy, slowest.
    Large,
}

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Unique identifier used in `SttConfig::model` (e.g. `"whisper-medium"`).
    pub id: &'static str,
    /// Human-readable display name used in log messages.
    pub display_name: &'static str,
    /// Model capacity tier.
    pub size: ModelSize,
    /// File name under the models directory (e.g. `"ggml-whisper-medium.bin"`).
    pub file_name: &'static str,
    /// Approximate compressed file size in megabytes.
    pub file_size_mb: u64,
    /// Minimum RAM required to run this model (megabytes).
    pub ram_required_mb: u64,
    /// Source URL for downloading the GGML file.
    pub source_url: &'static str,
}

// ---------------------------------------------------------------------------
// Standard Whisper models (multilingual)
// ---------------------------------------------------------------------------

/// Standard OpenAI Whisper models (99-language multilingual).
///
/// All of them support the `"auto"` language setting — the engine reports
/// the detected language per chunk.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "whisper-small",
        display_name: "Whisper Small (Multilingual, 99 langs)",
        size: ModelSize::Small,
        file_name: "ggml-whisper-small.bin",
        file_size_mb: 244,
        ram_required_mb: 1_000,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "whisper-medium",
        display_name: "Whisper Medium (Multilingual, 99 langs)",
        size: ModelSize::Medium,
        file_name: "ggml-whisper-medium.bin",
        file_size_mb: 769,
        ram_required_mb: 3_000,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
    ModelInfo {
        id: "whisper-large-v3",
        display_name: "Whisper Large-v3 (Multilingual, 99 langs)",
        size: ModelSize::Large,
        file_name: "ggml-whisper-large-v3.bin",
        file_size_mb: 1_550,
        ram_required_mb: 6_000,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp",
    },
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find a [`ModelInfo`] by its `id` string.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files from [`AppPaths`].
///
/// ```rust,no_run
/// use livescribe::config::AppPaths;
/// use livescribe::stt::{ModelPaths, WHISPER_MODELS};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// let available: Vec<_> = WHISPER_MODELS.iter()
///     .filter(|m| paths.is_available(m))
///     .collect();
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the application's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path (useful in tests).
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// Returns all registry models that are present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        WHISPER_MODELS
            .iter()
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_are_unique() {
        for (i, a) in WHISPER_MODELS.iter().enumerate() {
            for b in &WHISPER_MODELS[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate model id {}", a.id);
            }
        }
    }

    #[test]
    fn find_model_by_id_known() {
        let m = find_model_by_id("whisper-medium");
        assert!(m.is_some());
        assert_eq!(m.unwrap().size, ModelSize::Medium);
    }

    #[test]
    fn find_model_by_id_unknown() {
        assert!(find_model_by_id("does-not-exist").is_none());
    }

    #[test]
    fn model_paths_non_existent_returns_false() {
        let mp = ModelPaths::new("/nonexistent/path");
        let model = &WHISPER_MODELS[0];
        assert!(!mp.is_available(model));
    }

    #[test]
    fn model_paths_correct_file_name() {
        let mp = ModelPaths::new("/models");
        let model = &WHISPER_MODELS[1]; // whisper-medium
        let p = mp.model_path(model);
        assert!(p.to_str().unwrap().ends_with("ggml-whisper-medium.bin"));
    }
}
