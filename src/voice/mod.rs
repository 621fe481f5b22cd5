//! Voice processing module
//!
//! Microphone capture and transcription on the way in, speech synthesis
//! and playback on the way out.

mod activity;
mod capture;
mod http;
mod listener;
mod playback;
mod synth;
mod system;
mod transcribe;

use std::sync::Arc;

pub use activity::{ActivityDetector, ActivityState, calculate_energy};
pub use capture::{AudioCapture, SAMPLE_RATE};
pub use http::HttpVoice;
pub use listener::{Listener, MicListener, Utterance};
pub use playback::{Pcm, decode_mp3, play_blocking};
pub use synth::{Synthesizer, VoiceChoice, VoiceInfo, select_voice, voice_listing};
pub use system::SystemVoice;
pub use transcribe::{Transcriber, encode_wav};

use crate::Result;
use crate::config::{SpeechBackend, SpeechConfig};

/// Build the synthesizer selected in config
///
/// # Errors
///
/// Returns error if the selected engine is unavailable
pub fn synthesizer_from_config(config: &SpeechConfig) -> Result<Arc<dyn Synthesizer>> {
    let synth: Arc<dyn Synthesizer> = match config.backend {
        SpeechBackend::System => Arc::new(SystemVoice::locate(&config.program, config.rate)?),
        SpeechBackend::Http => Arc::new(HttpVoice::new(config)?),
    };
    tracing::debug!(backend = synth.name(), "synthesizer ready");
    Ok(synth)
}
