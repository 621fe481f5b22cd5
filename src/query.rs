//! Generation service client
//!
//! One request per turn against an Ollama-style `/api/generate` endpoint.
//! Every failure is folded into a [`QueryOutcome`] with a speakable fallback
//! reply, so callers never see a transport error.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::{Error, Result};

/// Reply used when the service answers with no text
pub const EMPTY_RESPONSE_REPLY: &str = "The AI returned an empty response.";

/// Reply used when the endpoint cannot be reached
pub const CONNECTION_ERROR_REPLY: &str = "Failed to connect to the Ollama server.";

/// Reply used when the request exceeds its timeout
pub const TIMED_OUT_REPLY: &str = "The AI took too long to respond.";

/// Category of a generation request's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Non-empty generated text
    Success,
    /// OK status but no generated text
    EmptyResponse,
    /// Non-OK HTTP status
    ServiceError(u16),
    /// Endpoint unreachable
    ConnectionError,
    /// Request timeout exceeded
    TimedOut,
    /// Any other transport fault, with a short diagnostic tag
    UnknownError(String),
}

impl QueryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Spoken reply standing in for generated text
    #[must_use]
    pub fn fallback_reply(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::EmptyResponse => Some(EMPTY_RESPONSE_REPLY.to_string()),
            Self::ServiceError(code) => Some(format!("Error {code} while querying the AI.")),
            Self::ConnectionError => Some(CONNECTION_ERROR_REPLY.to_string()),
            Self::TimedOut => Some(TIMED_OUT_REPLY.to_string()),
            Self::UnknownError(tag) => {
                Some(format!("An error occurred while accessing the AI ({tag})."))
            }
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::EmptyResponse => write!(f, "empty response"),
            Self::ServiceError(code) => write!(f, "service error {code}"),
            Self::ConnectionError => write!(f, "connection error"),
            Self::TimedOut => write!(f, "timed out"),
            Self::UnknownError(tag) => write!(f, "unknown error ({tag})"),
        }
    }
}

/// Reply text, outcome, and latency of one request
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Generated text on success, otherwise the fallback reply
    pub reply: String,
    pub outcome: QueryOutcome,
    pub elapsed: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Synchronous request/response wrapper around the generation service
#[derive(Clone)]
pub struct QueryClient {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl QueryClient {
    /// Create a client with the configured per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Wrap the user's words in the instruction template
    #[must_use]
    pub fn build_prompt(&self, user_text: &str) -> String {
        format!(
            "You are a helpful assistant. You must respond ONLY in {} language. \
             Answer briefly and directly. User question: {user_text}",
            self.config.language
        )
    }

    /// Send one prompt and categorize the result
    pub async fn query(&self, user_text: &str) -> QueryResult {
        let start = Instant::now();
        tracing::debug!(endpoint = %self.config.endpoint, model = %self.config.model, "sending generation request");

        let (reply, outcome) = match self.send(user_text).await {
            Ok((status, body)) => interpret(status, body.as_deref()),
            Err(e) => {
                let outcome = classify_transport_error(&e);
                tracing::warn!(error = %e, %outcome, "generation request failed");
                (None, outcome)
            }
        };

        let elapsed = start.elapsed();
        let reply = reply
            .or_else(|| outcome.fallback_reply())
            .unwrap_or_default();

        if outcome.is_success() {
            tracing::info!(
                elapsed_secs = elapsed.as_secs_f64(),
                words = reply.split_whitespace().count(),
                "generation complete"
            );
        } else {
            tracing::warn!(%outcome, elapsed_secs = elapsed.as_secs_f64(), "generation failed");
        }

        QueryResult {
            reply,
            outcome,
            elapsed,
        }
    }

    async fn send(&self, user_text: &str) -> reqwest::Result<(StatusCode, Option<String>)> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: self.build_prompt(user_text),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.num_predict,
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok((status, None));
        }

        let body: GenerateResponse = response.json().await?;
        Ok((status, Some(body.response)))
    }
}

/// Map an HTTP status and generated text to reply and outcome
fn interpret(status: StatusCode, generated: Option<&str>) -> (Option<String>, QueryOutcome) {
    if status != StatusCode::OK {
        return (None, QueryOutcome::ServiceError(status.as_u16()));
    }

    match generated.map(str::trim) {
        Some(text) if !text.is_empty() => (Some(text.to_string()), QueryOutcome::Success),
        _ => (None, QueryOutcome::EmptyResponse),
    }
}

/// Categorize a transport-level failure
fn classify_transport_error(e: &reqwest::Error) -> QueryOutcome {
    if e.is_timeout() {
        QueryOutcome::TimedOut
    } else if e.is_connect() {
        QueryOutcome::ConnectionError
    } else if e.is_decode() {
        QueryOutcome::UnknownError("decode".to_string())
    } else if e.is_body() {
        QueryOutcome::UnknownError("body".to_string())
    } else if e.is_redirect() {
        QueryOutcome::UnknownError("redirect".to_string())
    } else if e.is_builder() {
        QueryOutcome::UnknownError("builder".to_string())
    } else {
        QueryOutcome::UnknownError("request".to_string())
    }
}
