//! ASCII mouth drawn in the terminal corner

use std::io::{Stdout, Write};

use crossterm::{cursor, queue, style::Print, terminal};

use super::{Display, MouthFrame};
use crate::signal::QuitSignal;
use crate::{Error, Result};

const IDLE: [&str; 4] = [
    ".---------.",
    "|  o   o  |",
    "|   ___   |",
    "'---------'",
];

const OPEN: [&str; 4] = [
    ".---------.",
    "|  o   o  |",
    "|   (O)   |",
    "'---------'",
];

/// Width of every frame line
const WIDTH: u16 = 11;

/// Draws a fixed-size face in the top-right corner of the terminal
pub struct TerminalDisplay {
    out: Stdout,
    quit: QuitSignal,
}

impl TerminalDisplay {
    #[must_use]
    pub fn new(quit: QuitSignal) -> Self {
        Self {
            out: std::io::stdout(),
            quit,
        }
    }

    const fn lines(frame: MouthFrame) -> &'static [&'static str; 4] {
        match frame {
            MouthFrame::Idle => &IDLE,
            MouthFrame::Open => &OPEN,
        }
    }

    fn draw(&mut self, lines: &[&str]) -> std::io::Result<()> {
        let (cols, _) = terminal::size()?;
        let x = cols.saturating_sub(WIDTH + 1);

        queue!(self.out, cursor::SavePosition)?;
        for (row, line) in (0u16..).zip(lines) {
            queue!(self.out, cursor::MoveTo(x, row), Print(line))?;
        }
        queue!(self.out, cursor::RestorePosition)?;
        self.out.flush()
    }
}

impl Display for TerminalDisplay {
    fn render(&mut self, frame: MouthFrame) -> Result<()> {
        self.draw(Self::lines(frame))
            .map_err(|e| Error::Display(e.to_string()))
    }

    fn close_requested(&mut self) -> bool {
        self.quit.is_raised()
    }

    fn release(&mut self) -> Result<()> {
        let blank = " ".repeat(WIDTH as usize);
        let lines = [blank.as_str(); 4];
        self.draw(&lines).map_err(|e| Error::Display(e.to_string()))
    }
}
