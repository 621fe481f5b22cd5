//! Speech output worker
//!
//! Synthesis blocks, so each reply runs on a blocking thread. The worker owns
//! the writer half of the reply's [`SpeakingSignal`](crate::signal::SpeakingSignal)
//! and is the only one that raises or lowers it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::signal::SignalWriter;
use crate::voice::{Synthesizer, VoiceInfo, select_voice};
use crate::{Error, Result};

/// What one synthesis run produced
#[derive(Debug)]
pub struct SpeechReport {
    /// Wall time from raising the signal to lowering it
    pub elapsed: Duration,
    /// `Err` when the engine failed; the signal is lowered either way
    pub result: Result<()>,
}

/// Runs synthesis off the orchestrator's context
#[derive(Clone)]
pub struct SpeechWorker {
    synth: Arc<dyn Synthesizer>,
    preferences: Arc<[String]>,
}

impl SpeechWorker {
    #[must_use]
    pub fn new(synth: Arc<dyn Synthesizer>, preferences: Vec<String>) -> Self {
        Self {
            synth,
            preferences: preferences.into(),
        }
    }

    /// Start speaking `text` on a blocking thread
    ///
    /// The signal goes speaking before synthesis starts and finished when it
    /// returns, even on error or panic.
    #[must_use]
    pub fn spawn(&self, text: String, signal: SignalWriter) -> JoinHandle<SpeechReport> {
        let worker = self.clone();
        tokio::task::spawn_blocking(move || worker.speak(&text, &signal))
    }

    fn speak(&self, text: &str, signal: &SignalWriter) -> SpeechReport {
        let voice = self.choose_voice();

        signal.begin();
        let start = Instant::now();
        let result = self.synth.speak(voice.as_ref(), text);
        let elapsed = start.elapsed();
        signal.finish();

        if let Err(e) = &result {
            tracing::warn!(engine = self.synth.name(), error = %e, "speech synthesis failed");
        }

        SpeechReport { elapsed, result }
    }

    /// Voice for the next reply, or `None` to let the engine decide
    fn choose_voice(&self) -> Option<VoiceInfo> {
        let voices = match self.synth.list_voices() {
            Ok(voices) => voices,
            Err(e) => {
                tracing::warn!(error = %e, "could not list voices; using engine default");
                return None;
            }
        };

        let choice = select_voice(&voices, &self.preferences)?;
        if choice.matched {
            tracing::debug!(voice = %choice.voice, "voice selected");
        } else {
            tracing::info!(
                voice = %choice.voice,
                preferences = ?self.preferences,
                "no voice matches language preference; using first available"
            );
        }
        Some(choice.voice)
    }

    /// Voices the engine offers
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be queried
    pub async fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let synth = Arc::clone(&self.synth);
        tokio::task::spawn_blocking(move || synth.list_voices())
            .await
            .map_err(|e| Error::Speech(e.to_string()))?
    }

    #[must_use]
    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }
}
