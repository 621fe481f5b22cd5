//! Configuration management for Mouthpiece

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::{Error, Result};
use file::MouthpieceConfigFile;

/// Mouthpiece configuration
#[derive(Debug)]
pub struct Config {
    /// Generation service
    pub generation: GenerationConfig,

    /// Speech recognition
    pub recognition: RecognitionConfig,

    /// Speech synthesis
    pub speech: SpeechConfig,

    /// Mouth display
    pub display: DisplayConfig,

    /// Where the metrics report is written at shutdown
    pub metrics_path: PathBuf,
}

/// Generation service configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Generate endpoint
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Token budget (-1 = unlimited)
    pub num_predict: i32,

    /// Per-request timeout
    pub timeout: Duration,

    /// Language the reply must be written in
    pub language: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "phi3:mini".to_string(),
            temperature: 0.7,
            num_predict: -1,
            timeout: Duration::from_secs(30),
            language: "English".to_string(),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug)]
pub struct RecognitionConfig {
    /// Transcription endpoint (OpenAI-compatible)
    pub endpoint: String,

    /// STT model
    pub model: String,

    /// Bearer token, optional for local servers
    pub api_key: Option<SecretString>,

    /// Spoken language code
    pub language: String,

    /// How long to wait for speech to begin
    pub listen_timeout: Duration,

    /// Longest phrase captured
    pub phrase_limit: Duration,

    /// Silence that ends a phrase
    pub pause: Duration,

    /// Ambient noise calibration window
    pub ambient: Duration,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
            language: "en".to_string(),
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            pause: Duration::from_millis(800),
            ambient: Duration::from_millis(500),
        }
    }
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechBackend {
    /// Local command-line engine (espeak-ng)
    #[default]
    System,
    /// OpenAI-compatible speech endpoint
    Http,
}

impl FromStr for SpeechBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "system" | "espeak" | "espeak-ng" => Ok(Self::System),
            "http" | "openai" => Ok(Self::Http),
            other => Err(Error::Config(format!("unknown speech backend: {other}"))),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug)]
pub struct SpeechConfig {
    /// Which engine speaks
    pub backend: SpeechBackend,

    /// Engine program for the system backend
    pub program: String,

    /// Speaking rate in words per minute
    pub rate: u32,

    /// Voice language tags in order of preference
    pub language_preferences: Vec<String>,

    /// Speech endpoint for the http backend
    pub http_endpoint: String,

    /// TTS model for the http backend
    pub http_model: String,

    /// Voice for the http backend
    pub http_voice: String,

    /// Bearer token for the http backend
    pub api_key: Option<SecretString>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::System,
            program: "espeak-ng".to_string(),
            rate: 155,
            language_preferences: vec!["en".to_string()],
            http_endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            http_model: "tts-1".to_string(),
            http_voice: "alloy".to_string(),
            api_key: None,
        }
    }
}

/// How the mouth is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// ASCII mouth in the terminal
    #[default]
    Terminal,
    /// No visible output
    Headless,
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "terminal" | "tty" => Ok(Self::Terminal),
            "headless" | "none" => Ok(Self::Headless),
            other => Err(Error::Config(format!("unknown display mode: {other}"))),
        }
    }
}

/// Mouth display configuration
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub mode: DisplayMode,

    /// Animation ticks per second
    pub fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Terminal,
            fps: 6,
        }
    }
}

/// Command-line overrides, applied above env and file
#[derive(Debug, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub headless: bool,
}

/// Default metrics path: `~/.local/share/mouthpiece/metrics.json`
pub fn default_metrics_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("metrics.json"),
        |d| d.data_dir().join("mouthpiece").join("metrics.json"),
    )
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(&Overrides::default())
    }

    /// Load configuration with command-line overrides (cli > env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load_with_options(overrides: &Overrides) -> Result<Self> {
        let fc = overrides
            .config_file
            .as_deref()
            .map_or_else(file::load_config_file, file::load_from);

        Self::resolve(fc, overrides, |key| std::env::var(key).ok())
    }

    /// Merge file values, environment lookups, and overrides
    fn resolve(
        fc: MouthpieceConfigFile,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let gen_defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            endpoint: overrides
                .endpoint
                .clone()
                .or_else(|| env("MOUTHPIECE_GENERATION_URL"))
                .or(fc.generation.endpoint)
                .unwrap_or(gen_defaults.endpoint),
            model: overrides
                .model
                .clone()
                .or_else(|| env("MOUTHPIECE_MODEL"))
                .or(fc.generation.model)
                .unwrap_or(gen_defaults.model),
            temperature: fc.generation.temperature.unwrap_or(gen_defaults.temperature),
            num_predict: fc.generation.num_predict.unwrap_or(gen_defaults.num_predict),
            timeout: secs(fc.generation.timeout_secs, "generation.timeout_secs")?
                .unwrap_or(gen_defaults.timeout),
            language: fc.generation.language.unwrap_or(gen_defaults.language),
        };

        let openai_key = env("OPENAI_API_KEY");

        let rec_defaults = RecognitionConfig::default();
        let recognition = RecognitionConfig {
            endpoint: env("MOUTHPIECE_STT_URL")
                .or(fc.recognition.endpoint)
                .unwrap_or(rec_defaults.endpoint),
            model: env("MOUTHPIECE_STT_MODEL")
                .or(fc.recognition.model)
                .unwrap_or(rec_defaults.model),
            api_key: openai_key
                .clone()
                .or(fc.recognition.api_key)
                .map(SecretString::from),
            language: fc.recognition.language.unwrap_or(rec_defaults.language),
            listen_timeout: secs(fc.recognition.listen_timeout_secs, "recognition.listen_timeout_secs")?
                .unwrap_or(rec_defaults.listen_timeout),
            phrase_limit: secs(fc.recognition.phrase_limit_secs, "recognition.phrase_limit_secs")?
                .unwrap_or(rec_defaults.phrase_limit),
            pause: secs(fc.recognition.pause_secs, "recognition.pause_secs")?
                .unwrap_or(rec_defaults.pause),
            ambient: secs(fc.recognition.ambient_secs, "recognition.ambient_secs")?
                .unwrap_or(rec_defaults.ambient),
        };

        let speech_defaults = SpeechConfig::default();
        let backend = env("MOUTHPIECE_TTS_BACKEND")
            .or(fc.speech.backend)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(speech_defaults.backend);
        let speech = SpeechConfig {
            backend,
            program: fc.speech.program.unwrap_or(speech_defaults.program),
            rate: fc.speech.rate.unwrap_or(speech_defaults.rate),
            language_preferences: fc
                .speech
                .language_preferences
                .unwrap_or(speech_defaults.language_preferences),
            http_endpoint: fc.speech.http_endpoint.unwrap_or(speech_defaults.http_endpoint),
            http_model: fc.speech.http_model.unwrap_or(speech_defaults.http_model),
            http_voice: fc.speech.http_voice.unwrap_or(speech_defaults.http_voice),
            api_key: openai_key.or(fc.speech.api_key).map(SecretString::from),
        };

        let display_defaults = DisplayConfig::default();
        let mode = if overrides.headless {
            DisplayMode::Headless
        } else {
            fc.display
                .mode
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(display_defaults.mode)
        };
        let fps = fc.display.fps.unwrap_or(display_defaults.fps);
        if fps == 0 {
            return Err(Error::Config("display.fps must be at least 1".to_string()));
        }

        let metrics_path = overrides
            .metrics_path
            .clone()
            .or_else(|| env("MOUTHPIECE_METRICS_PATH").map(PathBuf::from))
            .or_else(|| fc.metrics.path.map(PathBuf::from))
            .unwrap_or_else(default_metrics_path);

        Ok(Self {
            generation,
            recognition,
            speech,
            display: DisplayConfig { mode, fps },
            metrics_path,
        })
    }

    /// Path the metrics report is written to
    #[must_use]
    pub fn metrics_path(&self) -> &Path {
        &self.metrics_path
    }
}

/// Convert an optional seconds value into a duration
fn secs(value: Option<f64>, key: &str) -> Result<Option<Duration>> {
    value
        .map(|v| {
            Duration::try_from_secs_f64(v)
                .map_err(|_| Error::Config(format!("{key} must be a non-negative number")))
        })
        .transpose()
}
