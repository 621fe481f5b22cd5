//! Interaction metrics
//!
//! Accumulates per-phase latencies and error counts for the lifetime of the
//! process and persists them as JSON at shutdown. Only the orchestrator
//! touches the aggregator, so it carries no synchronization.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::QueryOutcome;
use crate::{Error, Result};

/// Snapshot of everything measured so far
///
/// Durations are seconds. Field names are the persisted format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionMetrics {
    /// Turns that reached the query phase
    pub total_interactions: u64,
    /// Time spent in successful recognitions
    pub total_recognition_time: f64,
    /// Time spent in successful generation requests
    pub total_llm_time: f64,
    /// Time spent in completed syntheses
    pub total_speech_time: f64,
    /// Unintelligible speech and recognition service failures
    pub recognition_errors: u64,
    /// Generation requests with any non-success outcome
    pub llm_errors: u64,
}

/// Per-interaction averages, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub recognition: f64,
    pub llm: f64,
    pub speech: f64,
    pub per_interaction: f64,
}

/// Summary produced by [`MetricsAggregator::report`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsReport {
    pub metrics: InteractionMetrics,
    /// `None` until at least one interaction has been counted
    pub averages: Option<Averages>,
}

impl MetricsReport {
    /// Build a report from a snapshot
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_metrics(metrics: InteractionMetrics) -> Self {
        let averages = (metrics.total_interactions > 0).then(|| {
            let n = metrics.total_interactions as f64;
            Averages {
                recognition: metrics.total_recognition_time / n,
                llm: metrics.total_llm_time / n,
                speech: metrics.total_speech_time / n,
                per_interaction: (metrics.total_recognition_time
                    + metrics.total_llm_time
                    + metrics.total_speech_time)
                    / n,
            }
        });

        Self { metrics, averages }
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "PERFORMANCE REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total interactions: {}", self.metrics.total_interactions)?;

        if let Some(avg) = self.averages {
            writeln!(f)?;
            writeln!(f, "AVERAGE TIMES:")?;
            writeln!(f, "   Speech recognition: {:.2}s", avg.recognition)?;
            writeln!(f, "   LLM processing: {:.2}s", avg.llm)?;
            writeln!(f, "   Speech synthesis: {:.2}s", avg.speech)?;
            writeln!(f, "   Total time per interaction: {:.2}s", avg.per_interaction)?;
        }

        writeln!(f)?;
        writeln!(f, "ERRORS:")?;
        writeln!(f, "   Recognition failures: {}", self.metrics.recognition_errors)?;
        writeln!(f, "   LLM failures: {}", self.metrics.llm_errors)?;
        write!(f, "{rule}")
    }
}

/// Owns the process-wide metrics
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    metrics: InteractionMetrics,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values
    #[must_use]
    pub const fn snapshot(&self) -> InteractionMetrics {
        self.metrics
    }

    /// Count a turn that reached the query phase
    pub const fn record_interaction(&mut self) -> u64 {
        self.metrics.total_interactions += 1;
        self.metrics.total_interactions
    }

    /// Add the duration of a successful recognition
    pub fn record_recognition(&mut self, elapsed: Duration) {
        self.metrics.total_recognition_time += elapsed.as_secs_f64();
    }

    /// Count an unintelligible utterance or a recognition service failure
    ///
    /// Listen timeouts are not recognition errors.
    pub const fn record_recognition_error(&mut self) {
        self.metrics.recognition_errors += 1;
    }

    /// Record a generation request
    ///
    /// Only successful requests contribute latency.
    pub fn record_llm(&mut self, elapsed: Duration, outcome: &QueryOutcome) {
        if outcome.is_success() {
            self.metrics.total_llm_time += elapsed.as_secs_f64();
        } else {
            self.metrics.llm_errors += 1;
        }
    }

    /// Add the duration of a completed synthesis, whatever was spoken
    pub fn record_speech(&mut self, elapsed: Duration) {
        self.metrics.total_speech_time += elapsed.as_secs_f64();
    }

    #[must_use]
    pub fn report(&self) -> MetricsReport {
        MetricsReport::from_metrics(self.metrics)
    }

    /// Write the snapshot to `path`
    ///
    /// The file is written to a sibling temp file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file cannot be written
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Persistence(format!("cannot create {}: {e}", dir.display()))
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Persistence(format!("cannot create temp file: {e}")))?;

        serde_json::to_writer_pretty(&mut tmp, &self.metrics)
            .map_err(|e| Error::Persistence(format!("cannot encode metrics: {e}")))?;
        tmp.write_all(b"\n")
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::Persistence(format!("cannot write metrics: {e}")))?;

        tmp.persist(path).map_err(|e| {
            Error::Persistence(format!("cannot replace {}: {}", path.display(), e.error))
        })?;

        tracing::info!(path = %path.display(), "metrics saved");
        Ok(())
    }
}

/// Read a persisted snapshot
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file is missing or malformed
pub fn load(path: &Path) -> Result<InteractionMetrics> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Persistence(format!("cannot read {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Persistence(format!("cannot parse {}: {e}", path.display())))
}
