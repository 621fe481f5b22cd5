//! Speech synthesis contract and voice selection

use std::fmt;

use crate::Result;

/// A voice offered by a synthesis engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Human-readable name
    pub name: String,
    /// Identifier passed back to the engine
    pub id: String,
    /// Language tags (e.g. "en-us")
    pub languages: Vec<String>,
}

impl fmt::Display for VoiceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

/// A text-to-speech engine
///
/// Calls block until the engine is done; they run on the speech worker.
pub trait Synthesizer: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Voices the engine offers
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be queried
    fn list_voices(&self) -> Result<Vec<VoiceInfo>>;

    /// Speak `text` and return once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    fn speak(&self, voice: Option<&VoiceInfo>, text: &str) -> Result<()>;
}

/// Voice chosen for a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChoice {
    pub voice: VoiceInfo,
    /// False when no voice matched and the first one was used
    pub matched: bool,
}

/// Pick the first voice whose language tags match a preference, in
/// preference order, else the first voice available
///
/// A preference matches a tag when they are equal or the tag extends it
/// (`en` matches `en-gb`), ignoring case and `_`/`-` differences.
#[must_use]
pub fn select_voice(voices: &[VoiceInfo], preferences: &[String]) -> Option<VoiceChoice> {
    let matched = preferences.iter().find_map(|pref| {
        let pref = normalize_tag(pref);
        voices.iter().find(|voice| {
            voice
                .languages
                .iter()
                .any(|tag| tag_matches(&normalize_tag(tag), &pref))
        })
    });

    if let Some(voice) = matched {
        return Some(VoiceChoice {
            voice: voice.clone(),
            matched: true,
        });
    }

    voices.first().map(|voice| VoiceChoice {
        voice: voice.clone(),
        matched: false,
    })
}

/// Numbered, human-readable listing of `voices`
#[must_use]
pub fn voice_listing(voices: &[VoiceInfo]) -> String {
    let mut out = String::new();
    for (i, voice) in voices.iter().enumerate() {
        let languages = if voice.languages.is_empty() {
            "-".to_string()
        } else {
            voice.languages.join(", ")
        };
        out.push_str(&format!(
            "{}. {}\n   ID: {}\n   Languages: {languages}\n",
            i + 1,
            voice.name,
            voice.id
        ));
    }
    out
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace('_', "-")
}

fn tag_matches(tag: &str, pref: &str) -> bool {
    !pref.is_empty()
        && (tag == pref || tag.strip_prefix(pref).is_some_and(|rest| rest.starts_with('-')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, languages: &[&str]) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            id: name.to_lowercase(),
            languages: languages.iter().map(ToString::to_string).collect(),
        }
    }

    fn prefs(tags: &[&str]) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn picks_first_matching_voice() {
        let voices = [
            voice("Afrikaans", &["af"]),
            voice("English_(America)", &["en-US", "en"]),
            voice("English_(Scotland)", &["en-GB-scotland"]),
        ];

        let choice = select_voice(&voices, &prefs(&["en"])).unwrap();
        assert!(choice.matched);
        assert_eq!(choice.voice.name, "English_(America)");
    }

    #[test]
    fn preference_order_wins_over_voice_order() {
        let voices = [voice("English", &["en"]), voice("Portuguese", &["pt_BR"])];

        let choice = select_voice(&voices, &prefs(&["pt-br", "en"])).unwrap();
        assert_eq!(choice.voice.name, "Portuguese");
    }

    #[test]
    fn prefix_must_end_at_subtag_boundary() {
        let voices = [voice("Esperanto", &["eo"]), voice("Greek", &["el"])];

        // "e" is not a prefix match for "eo" or "el"
        let choice = select_voice(&voices, &prefs(&["e"])).unwrap();
        assert!(!choice.matched);
    }

    #[test]
    fn falls_back_to_first_voice() {
        let voices = [voice("German", &["de"]), voice("French", &["fr"])];

        let choice = select_voice(&voices, &prefs(&["en"])).unwrap();
        assert!(!choice.matched);
        assert_eq!(choice.voice.name, "German");
    }

    #[test]
    fn listing_numbers_voices() {
        let listing = voice_listing(&[voice("English", &["en", "en-us"]), voice("Mute", &[])]);
        assert!(listing.starts_with("1. English\n   ID: english\n   Languages: en, en-us\n"));
        assert!(listing.contains("2. Mute\n   ID: mute\n   Languages: -\n"));
    }

    #[test]
    fn no_voices_no_choice() {
        assert!(select_voice(&[], &prefs(&["en"])).is_none());
    }
}
