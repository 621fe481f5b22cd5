//! Reserved spoken commands

use std::fmt;

/// Words that are handled locally instead of being sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Say goodbye and shut down
    Exit,
    /// Print the metrics summary
    Report,
    /// List synthesis voices
    Voices,
}

impl VoiceCommand {
    /// Match recognized text against the command words
    ///
    /// Case, surrounding whitespace and trailing punctuation are ignored,
    /// so "  Exit. " is still `Exit`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text
            .trim()
            .trim_end_matches(['.', '!', '?', ','])
            .trim()
            .to_lowercase();

        match word.as_str() {
            "exit" => Some(Self::Exit),
            "report" => Some(Self::Report),
            "voices" => Some(Self::Voices),
            _ => None,
        }
    }

    #[must_use]
    pub const fn word(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Report => "report",
            Self::Voices => "voices",
        }
    }
}

impl fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.word())
    }
}
