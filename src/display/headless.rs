//! Display with no visible output

use super::{Display, MouthFrame};
use crate::Result;
use crate::signal::QuitSignal;

/// Tracks the current frame without drawing it
pub struct HeadlessDisplay {
    quit: QuitSignal,
    current: Option<MouthFrame>,
}

impl HeadlessDisplay {
    #[must_use]
    pub const fn new(quit: QuitSignal) -> Self {
        Self {
            quit,
            current: None,
        }
    }

    /// Last frame rendered
    #[must_use]
    pub const fn current(&self) -> Option<MouthFrame> {
        self.current
    }
}

impl Display for HeadlessDisplay {
    fn render(&mut self, frame: MouthFrame) -> Result<()> {
        tracing::trace!(?frame, "frame");
        self.current = Some(frame);
        Ok(())
    }

    fn close_requested(&mut self) -> bool {
        self.quit.is_raised()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_last_frame_and_follows_quit() {
        let quit = QuitSignal::new();
        let mut display = HeadlessDisplay::new(quit.clone());
        assert_eq!(display.current(), None);

        display.render(MouthFrame::Open).unwrap();
        display.render(MouthFrame::Idle).unwrap();
        assert_eq!(display.current(), Some(MouthFrame::Idle));

        assert!(!display.close_requested());
        quit.raise();
        assert!(display.close_requested());
        assert!(display.release().is_ok());
    }
}
