//! Error types for Mouthpiece

use thiserror::Error;

/// Result type alias for Mouthpiece operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Mouthpiece
///
/// Phase failures inside a turn are folded into outcome categories by the
/// orchestrator; these errors surface from setup, collaborators, and storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Display error
    #[error("display error: {0}")]
    Display(String),

    /// Speech worker failed to hand control back
    #[error("speech worker error: {0}")]
    Speech(String),

    /// Metrics storage error
    #[error("metrics persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
