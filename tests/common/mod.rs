//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use axum::{Json, Router, routing::post};
use mouthpiece::config::GenerationConfig;
use mouthpiece::{
    AnimationDriver, Display, Error, Listener, MouthFrame, Orchestrator, QueryClient, QuitSignal,
    Result, SpeechWorker, Synthesizer, Utterance, VoiceInfo,
};
use serde_json::Value;

/// Listener that replays a fixed script, then waits forever
pub struct ScriptedListener {
    script: VecDeque<Utterance>,
}

impl ScriptedListener {
    pub fn new(script: impl IntoIterator<Item = Utterance>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

#[async_trait(?Send)]
impl Listener for ScriptedListener {
    async fn listen(&mut self) -> Utterance {
        match self.script.pop_front() {
            Some(utterance) => utterance,
            None => std::future::pending().await,
        }
    }
}

/// Synthesizer that records what it was asked to say
#[derive(Clone)]
pub struct RecordingSynth {
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub delay: Duration,
    pub fail: bool,
}

impl RecordingSynth {
    pub fn new(delay: Duration) -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            delay,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::from_millis(20))
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Synthesizer for RecordingSynth {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        Ok(vec![
            VoiceInfo {
                name: "Deutsch".to_string(),
                id: "de".to_string(),
                languages: vec!["de".to_string()],
            },
            VoiceInfo {
                name: "English".to_string(),
                id: "en-us".to_string(),
                languages: vec!["en-us".to_string()],
            },
        ])
    }

    fn speak(&self, _voice: Option<&VoiceInfo>, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        std::thread::sleep(self.delay);
        if self.fail {
            Err(Error::Tts("synthesizer unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Display that records frames
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub frames: Arc<Mutex<Vec<MouthFrame>>>,
    pub released: Arc<AtomicBool>,
}

impl RecordingDisplay {
    pub fn frames(&self) -> Vec<MouthFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn was_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Display for RecordingDisplay {
    fn render(&mut self, frame: MouthFrame) -> Result<()> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn close_requested(&mut self) -> bool {
        false
    }

    fn release(&mut self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock generation service
pub struct MockGenerator {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl MockGenerator {
    /// Serve `body` with `status` on `/api/generate` after `delay`
    pub async fn start(status: StatusCode, body: Value, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let app = Router::new().route(
            "/api/generate",
            post(move |Json(request): Json<Value>| {
                let seen = Arc::clone(&seen);
                let body = body.clone();
                async move {
                    seen.lock().unwrap().push(request);
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }),
        );

        Self::serve(app, requests).await
    }

    /// Reply `{"response": text}` with 200 OK
    pub async fn replying(text: &str) -> Self {
        Self::start(
            StatusCode::OK,
            serde_json::json!({ "response": text, "done": true }),
            Duration::ZERO,
        )
        .await
    }

    /// Answer 200 OK with a plain-text body instead of JSON
    pub async fn serving_text(body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let app = Router::new().route(
            "/api/generate",
            post(move |Json(request): Json<Value>| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(request);
                    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], body)
                }
            }),
        );

        Self::serve(app, requests).await
    }

    async fn serve(app: Router, requests: Arc<Mutex<Vec<Value>>>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api/generate"),
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// An endpoint nothing listens on
pub fn unreachable_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/generate")
}

pub fn generation_config(endpoint: &str) -> GenerationConfig {
    GenerationConfig {
        endpoint: endpoint.to_string(),
        timeout: Duration::from_secs(5),
        ..GenerationConfig::default()
    }
}

/// Handles kept by a test after the orchestrator takes ownership
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub synth: RecordingSynth,
    pub display: RecordingDisplay,
    pub quit: QuitSignal,
}

/// Orchestrator wired to scripted and recording collaborators
pub fn harness(
    script: impl IntoIterator<Item = Utterance>,
    endpoint: &str,
    synth: RecordingSynth,
) -> Harness {
    let display = RecordingDisplay::default();
    let quit = QuitSignal::new();
    let client = QueryClient::new(generation_config(endpoint)).unwrap();
    let speech = SpeechWorker::new(Arc::new(synth.clone()), vec!["en".to_string()]);

    let orchestrator = Orchestrator::new(
        Box::new(ScriptedListener::new(script)),
        Box::new(display.clone()),
        client,
        speech,
        quit.clone(),
    )
    .with_animation(AnimationDriver::with_fps(50));

    Harness {
        orchestrator,
        synth,
        display,
        quit,
    }
}
