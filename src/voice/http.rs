//! Remote speech engine over an OpenAI-compatible `/audio/speech` endpoint

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::playback::{decode_mp3, play_blocking};
use super::synth::{Synthesizer, VoiceInfo};
use crate::config::SpeechConfig;
use crate::{Error, Result};

/// Voices the speech API accepts
const CATALOG: &[&str] = &[
    "alloy", "ash", "coral", "echo", "fable", "onyx", "nova", "sage", "shimmer",
];

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Synthesizes remotely and plays the returned MP3 locally
pub struct HttpVoice {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    default_voice: String,
    api_key: Option<SecretString>,
}

impl HttpVoice {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        if config.api_key.is_none() {
            tracing::warn!("no API key configured for HTTP speech; requests may be rejected");
        }

        Ok(Self {
            client,
            endpoint: config.http_endpoint.clone(),
            model: config.http_model.clone(),
            default_voice: config.http_voice.clone(),
            api_key: config
                .api_key
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_string())),
        })
    }

    async fn synthesize(&self, voice: &str, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: "mp3",
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech API error {status}: {body}")));
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| Error::Tts(e.to_string()))?
            .to_vec())
    }
}

impl Synthesizer for HttpVoice {
    fn name(&self) -> &'static str {
        "http"
    }

    fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        Ok(catalog())
    }

    fn speak(&self, voice: Option<&VoiceInfo>, text: &str) -> Result<()> {
        let voice = voice.map_or(self.default_voice.as_str(), |v| v.id.as_str());
        // Runs on a blocking worker thread that still sees the runtime
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Tts(format!("no async runtime for HTTP speech: {e}")))?;
        let mp3 = runtime.block_on(self.synthesize(voice, text))?;
        tracing::debug!(voice, audio_bytes = mp3.len(), "speech synthesized");
        play_blocking(decode_mp3(&mp3)?)
    }
}

/// Catalog voices are multilingual; they all answer to "en"
fn catalog() -> Vec<VoiceInfo> {
    CATALOG
        .iter()
        .map(|id| {
            let mut name = id.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            VoiceInfo {
                name,
                id: (*id).to_string(),
                languages: vec!["en".to_string()],
            }
        })
        .collect()
}
