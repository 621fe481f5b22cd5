//! Animation driver
//!
//! Fixed-rate loop run on the orchestrator's context while the speech worker
//! talks. Each tick it checks for a quit request, then reads the speaking
//! signal: pending draws nothing new, speaking alternates the mouth, finished
//! draws the idle frame once and returns.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::display::{Display, MouthFrame};
use crate::signal::{QuitSignal, SignalReader, SpeechPhase};

/// How an animation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// The worker finished and the idle frame was drawn
    Completed {
        /// Ticks elapsed, including the final one
        ticks: u64,
        /// Open-mouth frames drawn
        open_frames: u64,
    },
    /// Quit was requested mid-reply
    Quit,
}

/// Drives the mouth at a fixed tick rate
#[derive(Debug, Clone, Copy)]
pub struct AnimationDriver {
    tick: Duration,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::with_fps(6)
    }
}

impl AnimationDriver {
    /// Driver ticking `fps` times per second
    #[must_use]
    pub fn with_fps(fps: u32) -> Self {
        Self {
            tick: Duration::from_secs(1) / fps.max(1),
        }
    }

    #[must_use]
    pub const fn tick(&self) -> Duration {
        self.tick
    }

    /// Animate until the worker finishes or quit is requested
    ///
    /// Render failures are logged and do not stop the loop.
    pub async fn animate(
        &self,
        display: &mut dyn Display,
        signal: &SignalReader,
        quit: &QuitSignal,
    ) -> AnimationOutcome {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut frame = MouthFrame::Idle;
        let mut ticks = 0u64;
        let mut open_frames = 0u64;

        loop {
            interval.tick().await;
            ticks += 1;

            if quit.is_raised() || display.close_requested() {
                tracing::info!("display closed during reply");
                return AnimationOutcome::Quit;
            }

            match signal.phase() {
                // Worker not started yet: nothing to animate
                SpeechPhase::Pending => {}
                SpeechPhase::Speaking => {
                    frame = frame.toggled();
                    if frame == MouthFrame::Open {
                        open_frames += 1;
                    }
                    draw(display, frame);
                }
                SpeechPhase::Finished => {
                    draw(display, MouthFrame::Idle);
                    tracing::trace!(ticks, open_frames, "animation finished");
                    return AnimationOutcome::Completed { ticks, open_frames };
                }
            }
        }
    }
}

fn draw(display: &mut dyn Display, frame: MouthFrame) {
    if let Err(e) = display.render(frame) {
        tracing::warn!(error = %e, "failed to render frame");
    }
}
