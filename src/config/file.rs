//! TOML configuration file loading
//!
//! Supports `~/.config/mouthpiece/config.toml` as a persistent config source.
//! All fields are optional, the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MouthpieceConfigFile {
    /// Generation service configuration
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub recognition: RecognitionFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Mouth display configuration
    #[serde(default)]
    pub display: DisplayFileConfig,

    /// Metrics storage configuration
    #[serde(default)]
    pub metrics: MetricsFileConfig,
}

/// Generation service configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    /// Generate endpoint (e.g. `http://localhost:11434/api/generate`)
    pub endpoint: Option<String>,

    /// Model identifier (e.g. "phi3:mini")
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (-1 for unlimited)
    pub num_predict: Option<i32>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<f64>,

    /// Language the reply must be written in (e.g. "English")
    pub language: Option<String>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionFileConfig {
    /// Transcription endpoint (OpenAI-compatible)
    pub endpoint: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub model: Option<String>,

    /// API key for the transcription endpoint
    pub api_key: Option<String>,

    /// Spoken language code (e.g. "en")
    pub language: Option<String>,

    /// Seconds to wait for speech to begin
    pub listen_timeout_secs: Option<f64>,

    /// Maximum phrase length in seconds
    pub phrase_limit_secs: Option<f64>,

    /// Silence that ends a phrase, in seconds
    pub pause_secs: Option<f64>,

    /// Ambient noise calibration window, in seconds
    pub ambient_secs: Option<f64>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// "system" or "http"
    pub backend: Option<String>,

    /// Speech engine program for the system backend
    pub program: Option<String>,

    /// Speaking rate in words per minute
    pub rate: Option<u32>,

    /// Voice language tags in order of preference
    pub language_preferences: Option<Vec<String>>,

    /// Speech endpoint for the http backend
    pub http_endpoint: Option<String>,

    /// TTS model for the http backend
    pub http_model: Option<String>,

    /// Voice for the http backend
    pub http_voice: Option<String>,

    /// API key for the http backend
    pub api_key: Option<String>,
}

/// Mouth display configuration
#[derive(Debug, Default, Deserialize)]
pub struct DisplayFileConfig {
    /// "terminal" or "headless"
    pub mode: Option<String>,

    /// Animation frames per second
    pub fps: Option<u32>,
}

/// Metrics storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct MetricsFileConfig {
    /// Path of the persisted metrics report
    pub path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MouthpieceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> MouthpieceConfigFile {
    config_file_path().map_or_else(MouthpieceConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_from(path: &Path) -> MouthpieceConfigFile {
    if !path.exists() {
        return MouthpieceConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MouthpieceConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MouthpieceConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/mouthpiece/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mouthpiece").join("config.toml"))
}
