//! Speech capture adapter
//!
//! One blocking listen per turn: wait for a phrase (bounded), transcribe it,
//! and hand the orchestrator an [`Utterance`].

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::activity::{ActivityDetector, ActivityState};
use super::capture::{AudioCapture, SAMPLE_RATE};
use super::transcribe::{Transcriber, encode_wav};
use crate::Result;
use crate::config::RecognitionConfig;

/// How often the capture buffer is drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Utterance {
    /// Recognized text and the time the listen took
    Speech { text: String, elapsed: Duration },
    /// Nobody spoke before the listen timeout
    Timeout,
    /// Speech was heard but nothing could be transcribed
    Unintelligible,
    /// The recognition service failed
    ServiceError(String),
}

impl Utterance {
    /// Recognized text with no timing, mostly for scripted input
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Speech {
            text: text.into(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Source of utterances
///
/// Implementations may hold non-`Send` audio handles, so listening happens on
/// the orchestrator's own context.
#[async_trait(?Send)]
pub trait Listener {
    /// Wait for the next utterance
    async fn listen(&mut self) -> Utterance;
}

/// Microphone listener backed by a transcription service
pub struct MicListener {
    capture: AudioCapture,
    transcriber: Transcriber,
    listen_timeout: Duration,
    phrase_limit: Duration,
    pause: Duration,
    ambient: Duration,
}

impl MicListener {
    /// Open the default microphone
    ///
    /// # Errors
    ///
    /// Returns error if the input device or HTTP client cannot be set up
    pub fn open(config: &RecognitionConfig) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::open()?,
            transcriber: Transcriber::new(config)?,
            listen_timeout: config.listen_timeout,
            phrase_limit: config.phrase_limit,
            pause: config.pause,
            ambient: config.ambient,
        })
    }

    /// Record one phrase, or `None` if speech never started
    async fn record_phrase(&self) -> Option<Vec<f32>> {
        // Whatever was captured while we were talking is not user input
        self.capture.clear();

        let deadline = Instant::now() + self.ambient + self.listen_timeout;
        let mut detector = ActivityDetector::new(SAMPLE_RATE, self.pause, self.ambient);
        let mut phrase_started: Option<Instant> = None;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let chunk = self.capture.take();
            let state = if chunk.is_empty() {
                detector.state()
            } else {
                detector.process(&chunk)
            };

            match state {
                ActivityState::Calibrating | ActivityState::Waiting => {
                    phrase_started = None;
                    if Instant::now() >= deadline {
                        return None;
                    }
                }
                ActivityState::Speaking => {
                    let started = *phrase_started.get_or_insert_with(Instant::now);
                    if started.elapsed() >= self.phrase_limit {
                        tracing::debug!("phrase limit reached");
                        return Some(detector.take_speech_buffer());
                    }
                }
                ActivityState::Complete => return Some(detector.take_speech_buffer()),
            }
        }
    }
}

#[async_trait(?Send)]
impl Listener for MicListener {
    async fn listen(&mut self) -> Utterance {
        let start = Instant::now();
        println!("Listening... speak now.");

        let Some(phrase) = self.record_phrase().await else {
            tracing::debug!("listen timed out");
            return Utterance::Timeout;
        };

        let wav = match encode_wav(&phrase, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return Utterance::ServiceError(e.to_string()),
        };

        match self.transcriber.transcribe(wav).await {
            Ok(text) if text.is_empty() => Utterance::Unintelligible,
            Ok(text) => {
                let elapsed = start.elapsed();
                tracing::info!(transcript = %text, elapsed_secs = elapsed.as_secs_f64(), "recognized");
                Utterance::Speech { text, elapsed }
            }
            Err(e) => Utterance::ServiceError(e.to_string()),
        }
    }
}
