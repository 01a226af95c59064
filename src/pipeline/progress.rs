// src/pipeline/progress.rs

//! Progress event stream shared by the adapters and the orchestrator.
//!
//! Events are append-only and consumable while the run is still going,
//! so UI collaborators can display them in real time. The channel is
//! safe for concurrent producers; both adapters hold clones of the
//! sending handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Fetch,
    Page,
    Row,
    Filter,
    Match,
    Warning,
    Done,
    Error,
}

/// One entry in the progress stream.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Cloneable handle for emitting progress events.
///
/// Emitting never blocks; when the subscriber has hung up the event is
/// silently dropped, so a run outlives its observer.
#[derive(Debug, Clone)]
pub struct Progress {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Progress {
    /// Create a progress handle plus the receiving end of its stream.
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every event, for callers that do not care
    /// about progress.
    pub fn sink() -> Self {
        Self { tx: None }
    }

    /// Emit one event.
    pub fn emit(&self, stage: Stage, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                stage,
                message: message.into(),
                timestamp: Utc::now(),
            });
        }
    }

    /// Emit a warning event and mirror it to the log.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.emit(Stage::Warning, message);
    }
}
