//! Mouth display
//!
//! Shows exactly one of two frames. Drawing is an external concern; the
//! animation driver only needs `render` and a close check.

mod headless;
mod terminal;

pub use headless::HeadlessDisplay;
pub use terminal::TerminalDisplay;

use crate::Result;
use crate::config::{DisplayConfig, DisplayMode};
use crate::signal::QuitSignal;

/// The two mutually exclusive visual states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouthFrame {
    /// Mouth closed
    Idle,
    /// Mouth open
    Open,
}

impl MouthFrame {
    /// The other frame
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Idle => Self::Open,
            Self::Open => Self::Idle,
        }
    }
}

/// A surface the mouth is drawn on
pub trait Display {
    /// Draw one frame
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be drawn
    fn render(&mut self, frame: MouthFrame) -> Result<()>;

    /// Whether the user asked to close the display
    fn close_requested(&mut self) -> bool;

    /// Release the surface at shutdown
    ///
    /// # Errors
    ///
    /// Returns error if the surface cannot be cleaned up
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the configured display
#[must_use]
pub fn from_config(config: DisplayConfig, quit: QuitSignal) -> Box<dyn Display> {
    match config.mode {
        DisplayMode::Terminal => Box::new(TerminalDisplay::new(quit)),
        DisplayMode::Headless => Box::new(HeadlessDisplay::new(quit)),
    }
}
