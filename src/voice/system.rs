//! Local speech engine driven through its command line (espeak-ng)

use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::synth::{Synthesizer, VoiceInfo};
use crate::{Error, Result};

/// Engines tried when the configured program is missing
const FALLBACK_PROGRAMS: &[&str] = &["espeak-ng", "espeak"];

/// Speaks through an installed espeak-compatible program
pub struct SystemVoice {
    program: PathBuf,
    rate: u32,
}

impl SystemVoice {
    /// Locate the engine on `PATH`
    ///
    /// # Errors
    ///
    /// Returns error if neither the configured program nor a fallback is installed
    pub fn locate(program: &str, rate: u32) -> Result<Self> {
        let program = std::iter::once(program)
            .chain(FALLBACK_PROGRAMS.iter().copied())
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| {
                Error::Tts(format!(
                    "speech engine not found: install {program} or set speech.backend = \"http\""
                ))
            })?;

        tracing::debug!(program = %program.display(), rate, "system speech engine located");
        Ok(Self { program, rate })
    }
}

impl Synthesizer for SystemVoice {
    fn name(&self) -> &'static str {
        "system"
    }

    fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(Error::Tts(format!(
                "{} --voices exited with {}",
                self.program.display(),
                output.status
            )));
        }

        Ok(parse_voice_table(&String::from_utf8_lossy(&output.stdout)))
    }

    fn speak(&self, voice: Option<&VoiceInfo>, text: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-s").arg(self.rate.to_string());
        if let Some(voice) = voice {
            cmd.arg("-v").arg(&voice.id);
        }

        let status = cmd
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Tts(format!(
                "{} exited with {status}",
                self.program.display()
            )))
        }
    }
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-us           --/M      English_(America)  gmw/en-US           (en 3)
/// ```
fn parse_voice_table(table: &str) -> Vec<VoiceInfo> {
    table
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let language = cols.next()?;
            let _age_gender = cols.next()?;
            let name = cols.next()?;
            let _file = cols.next();

            let mut languages = vec![language.to_string()];
            // Remaining columns come in "(tag priority)" pairs
            languages.extend(
                cols.filter_map(|c| c.strip_prefix('('))
                    .map(ToString::to_string),
            );

            Some(VoiceInfo {
                name: name.to_string(),
                id: language.to_string(),
                languages,
            })
        })
        .collect()
}
