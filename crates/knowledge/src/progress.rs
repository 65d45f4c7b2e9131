//! Progress reporting for ingestion.
//!
//! Long runs emit one event per discovered file, loaded document, chunked
//! document, embedded sub-batch and committed batch.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discover,
    Load,
    Chunk,
    Embed,
    Index,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Discover => "discover",
            Phase::Load => "load",
            Phase::Chunk => "chunk",
            Phase::Embed => "embed",
            Phase::Index => "index",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: u64,
    pub total: Option<u64>,
    pub message: String,
    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        })
    }

    /// `[phase] current/total (pct%) - message`
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase.as_str(), progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let Some(callback) = &self.callback else {
            return;
        };

        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };
        tracing::trace!(
            phase = phase.as_str(),
            current,
            total = ?total,
            message = %event.message,
            "Progress event"
        );
        callback(event);
    }

    pub fn discover(&self, found: u64, path: &str) {
        self.emit(Phase::Discover, found, None, format!("found {}", path));
    }

    pub fn load(&self, current: u64, total: u64, source: &str) {
        self.emit(Phase::Load, current, Some(total), format!("reading {}", source));
    }

    pub fn chunk(&self, current: u64, total: u64, source: &str, passages: usize) {
        self.emit(
            Phase::Chunk,
            current,
            Some(total),
            format!("{}: {} passages", source, passages),
        );
    }

    pub fn embed(&self, done: u64, total: u64, model: &str) {
        self.emit(Phase::Embed, done, Some(total), format!("model={}", model));
    }

    pub fn index(&self, batch: &str, passages: usize) {
        self.emit(
            Phase::Index,
            passages as u64,
            None,
            format!("{} committed", batch),
        );
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}
