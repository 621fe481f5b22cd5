//! Mouthpiece - a talking front-end for local language models
//!
//! Listens for a spoken question, asks a generation service for a reply,
//! speaks the reply and animates a mouth while it talks. Every turn feeds a
//! metrics aggregator that is persisted at shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Orchestrator                       │
//! │  Listening → Command │ Querying → Responding → Idle  │
//! └──────┬──────────────┬──────────────┬─────────────────┘
//!        │              │              │
//! ┌──────▼─────┐ ┌──────▼──────┐ ┌─────▼──────────────────┐
//! │  Listener  │ │ QueryClient │ │ SpeechWorker ∥ Driver  │
//! │ mic + STT  │ │ /generate   │ │  SpeakingSignal        │
//! └────────────┘ └─────────────┘ └────────────────────────┘
//!                       │
//!              ┌────────▼─────────┐
//!              │ MetricsAggregator│
//!              └──────────────────┘
//! ```

pub mod animation;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod query;
pub mod signal;
pub mod speech;
pub mod voice;

pub use animation::{AnimationDriver, AnimationOutcome};
pub use commands::VoiceCommand;
pub use config::Config;
pub use display::{Display, MouthFrame};
pub use error::{Error, Result};
pub use metrics::{InteractionMetrics, MetricsAggregator, MetricsReport};
pub use orchestrator::{Orchestrator, Shutdown, TurnOutcome};
pub use query::{QueryClient, QueryOutcome, QueryResult};
pub use signal::{QuitSignal, SignalReader, SignalWriter, SpeakingSignal, SpeechPhase};
pub use speech::{SpeechReport, SpeechWorker};
pub use voice::{Listener, Synthesizer, Utterance, VoiceInfo};
