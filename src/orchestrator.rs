//! Interaction orchestrator
//!
//! Runs the conversation one turn at a time:
//!
//! ```text
//! Idle -> Listening -> Timeout ------------------------------> Idle
//!                   -> CommandDispatch (report, voices) ----> Idle
//!                   -> CommandDispatch (exit) -> Responding -> Terminating
//!                   -> Querying -> Responding --------------> Idle
//! ```
//!
//! Phase failures are folded into metrics and spoken fallbacks here; only the
//! exit command or a quit request ends the loop.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::animation::{AnimationDriver, AnimationOutcome};
use crate::commands::VoiceCommand;
use crate::display::{Display, MouthFrame};
use crate::metrics::{MetricsAggregator, MetricsReport};
use crate::query::{QueryClient, QueryOutcome};
use crate::signal::{QuitSignal, SpeakingSignal};
use crate::speech::SpeechWorker;
use crate::voice::{Listener, Utterance, voice_listing};

/// Spoken after the exit command
pub const GOODBYE_REPLY: &str = "Goodbye!";

/// Spoken when speech was heard but not understood
pub const UNINTELLIGIBLE_REPLY: &str = "Sorry, I did not understand.";

/// Spoken when the recognition service could not be reached
pub const RECOGNITION_ERROR_REPLY: &str = "Speech recognition is unavailable right now.";

/// Longest reply shown in full in the turn log
const PREVIEW_CHARS: usize = 100;

/// How one turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nobody spoke; nothing recorded
    Timeout,
    /// A local command other than exit was handled
    Command(VoiceCommand),
    /// Recognition failed; a fallback was spoken
    RecognitionFailed,
    /// The query phase ran and its reply (or fallback) was spoken
    Replied {
        interaction: u64,
        reply: String,
        outcome: QueryOutcome,
        /// Measured query latency, as recorded in the metrics
        llm_elapsed: Duration,
    },
    /// The exit command was spoken; goodbye has been said
    Exit,
    /// Quit was requested; the turn was abandoned
    Quit,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The user said exit
    Exit,
    /// Interrupt or display close
    Quit,
}

enum Responded {
    Completed,
    Quit,
}

/// Owns every collaborator of the conversation loop
pub struct Orchestrator {
    listener: Box<dyn Listener>,
    display: Box<dyn Display>,
    client: QueryClient,
    speech: SpeechWorker,
    animation: AnimationDriver,
    metrics: MetricsAggregator,
    quit: QuitSignal,
    metrics_path: Option<PathBuf>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        listener: Box<dyn Listener>,
        display: Box<dyn Display>,
        client: QueryClient,
        speech: SpeechWorker,
        quit: QuitSignal,
    ) -> Self {
        Self {
            listener,
            display,
            client,
            speech,
            animation: AnimationDriver::default(),
            metrics: MetricsAggregator::new(),
            quit,
            metrics_path: None,
        }
    }

    #[must_use]
    pub const fn with_animation(mut self, animation: AnimationDriver) -> Self {
        self.animation = animation;
        self
    }

    /// Persist metrics to `path` on shutdown
    #[must_use]
    pub fn with_metrics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Run turns until exit or quit
    pub async fn run(&mut self) -> Shutdown {
        self.draw(MouthFrame::Idle);
        loop {
            match self.turn().await {
                TurnOutcome::Exit => return Shutdown::Exit,
                TurnOutcome::Quit => return Shutdown::Quit,
                outcome => tracing::trace!(?outcome, "turn complete"),
            }
        }
    }

    /// Run one turn from Listening back to Idle
    pub async fn turn(&mut self) -> TurnOutcome {
        if self.quit_requested() {
            return TurnOutcome::Quit;
        }

        let utterance = tokio::select! {
            utterance = self.listener.listen() => utterance,
            () = self.quit.raised() => return TurnOutcome::Quit,
        };

        match utterance {
            Utterance::Timeout => {
                tracing::debug!("listen timed out");
                TurnOutcome::Timeout
            }
            Utterance::Unintelligible => {
                tracing::info!("speech not understood");
                self.recognition_failed(UNINTELLIGIBLE_REPLY).await
            }
            Utterance::ServiceError(error) => {
                tracing::warn!(%error, "recognition service error");
                self.recognition_failed(RECOGNITION_ERROR_REPLY).await
            }
            Utterance::Speech { text, elapsed } => {
                let text = text.trim();
                if text.is_empty() {
                    return self.recognition_failed(UNINTELLIGIBLE_REPLY).await;
                }

                self.metrics.record_recognition(elapsed);
                tracing::info!(
                    input = %text,
                    recognition_secs = elapsed.as_secs_f64(),
                    "heard"
                );

                match VoiceCommand::parse(text) {
                    Some(command) => self.dispatch(command).await,
                    None => self.converse(text).await,
                }
            }
        }
    }

    /// Persist metrics, print the final report and release the display
    pub fn finish(&mut self) -> MetricsReport {
        if let Some(path) = &self.metrics_path {
            match self.metrics.persist(path) {
                Ok(()) => println!("Metrics saved to {}", path.display()),
                Err(e) => tracing::error!(error = %e, "failed to save metrics"),
            }
        }

        let report = self.metrics.report();
        println!("{report}");

        if let Err(e) = self.display.release() {
            tracing::warn!(error = %e, "failed to release display");
        }
        report
    }

    async fn dispatch(&mut self, command: VoiceCommand) -> TurnOutcome {
        tracing::info!(%command, "command");
        match command {
            VoiceCommand::Exit => match self.respond(GOODBYE_REPLY.to_string()).await {
                Responded::Completed => TurnOutcome::Exit,
                Responded::Quit => TurnOutcome::Quit,
            },
            VoiceCommand::Report => {
                println!("{}", self.metrics.report());
                TurnOutcome::Command(command)
            }
            VoiceCommand::Voices => {
                match self.speech.list_voices().await {
                    Ok(voices) if voices.is_empty() => println!("No synthesis voices available."),
                    Ok(voices) => println!("Available voices:\n{}", voice_listing(&voices)),
                    Err(e) => tracing::warn!(error = %e, "could not list voices"),
                }
                TurnOutcome::Command(command)
            }
        }
    }

    async fn converse(&mut self, text: &str) -> TurnOutcome {
        let interaction = self.metrics.record_interaction();
        let turn_start = Instant::now();
        tracing::info!(
            interaction,
            at = %chrono::Local::now().format("%H:%M:%S"),
            input_words = text.split_whitespace().count(),
            "interaction"
        );

        let result = tokio::select! {
            result = self.client.query(text) => result,
            () = self.quit.raised() => return TurnOutcome::Quit,
        };
        self.metrics.record_llm(result.elapsed, &result.outcome);

        if result.outcome.is_success() {
            tracing::info!(
                llm_secs = result.elapsed.as_secs_f64(),
                output_words = result.reply.split_whitespace().count(),
                reply = %preview(&result.reply),
                "reply"
            );
        } else {
            tracing::debug!(outcome = %result.outcome, "speaking fallback reply");
        }

        match self.respond(result.reply.clone()).await {
            Responded::Quit => TurnOutcome::Quit,
            Responded::Completed => {
                tracing::info!(
                    interaction,
                    total_secs = turn_start.elapsed().as_secs_f64(),
                    "interaction complete"
                );
                TurnOutcome::Replied {
                    interaction,
                    reply: result.reply,
                    outcome: result.outcome,
                    llm_elapsed: result.elapsed,
                }
            }
        }
    }

    async fn recognition_failed(&mut self, fallback: &str) -> TurnOutcome {
        self.metrics.record_recognition_error();
        match self.respond(fallback.to_string()).await {
            Responded::Completed => TurnOutcome::RecognitionFailed,
            Responded::Quit => TurnOutcome::Quit,
        }
    }

    /// Speak on the worker while animating here, then join the worker
    async fn respond(&mut self, text: String) -> Responded {
        let (writer, reader) = SpeakingSignal::pair();
        let worker = self.speech.spawn(text, writer);

        let animation = self
            .animation
            .animate(self.display.as_mut(), &reader, &self.quit)
            .await;

        if animation == AnimationOutcome::Quit {
            // The worker is left to finish on its own; the process is ending
            return Responded::Quit;
        }

        match worker.await {
            Ok(report) => match report.result {
                Ok(()) => {
                    self.metrics.record_speech(report.elapsed);
                    tracing::info!(speech_secs = report.elapsed.as_secs_f64(), "spoke");
                }
                Err(e) => tracing::warn!(error = %e, "reply was not spoken"),
            },
            Err(e) => tracing::error!(error = %e, "speech worker panicked"),
        }
        Responded::Completed
    }

    fn quit_requested(&mut self) -> bool {
        self.quit.is_raised() || self.display.close_requested()
    }

    fn draw(&mut self, frame: MouthFrame) {
        if let Err(e) = self.display.render(frame) {
            tracing::warn!(error = %e, "failed to render frame");
        }
    }
}

fn preview(reply: &str) -> String {
    match reply.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &reply[..cut]),
        None => reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_replies() {
        assert_eq!(preview("short"), "short");

        let long = "a".repeat(PREVIEW_CHARS + 5);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), PREVIEW_CHARS + 3);
    }
}
