//! Recognition Requests
//!
//! A request pairs a shared status cell, written by whichever worker runs the
//! recognition, with the correlation data needed to apply its result. The
//! worker only ever touches the [`RequestHandle`]; the queue owns the rest.

use crate::capture::types::PagePattern;
use crate::registry::MarkKey;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// What is being recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecognitionKind {
    /// Printed text under a pen circle
    Ocr,
    /// Handwriting from a sticky-note input box
    Handwriting,
}

impl std::fmt::Display for RecognitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionKind::Ocr => f.write_str("OCR"),
            RecognitionKind::Handwriting => f.write_str("HANDWRITING"),
        }
    }
}

/// Lifecycle of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Done,
    Error,
}

impl RequestStatus {
    /// Done or Error
    pub fn is_finished(&self) -> bool {
        matches!(self, RequestStatus::Done | RequestStatus::Error)
    }
}

/// Search scope a listener is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListenerTag {
    LocalSearch,
    OnlineSearch,
}

impl ListenerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerTag::LocalSearch => "local-search",
            ListenerTag::OnlineSearch => "online-search",
        }
    }
}

/// Where a request's result goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Correlation {
    /// The PEN_CIRCLE at `key` on `pattern`
    Mark { pattern: PagePattern, key: MarkKey },
    /// Sticky-note ink of `pattern`, submitted for a search listener
    Listener { pattern: PagePattern, tag: ListenerTag },
}

impl Correlation {
    pub fn pattern(&self) -> PagePattern {
        match self {
            Correlation::Mark { pattern, .. } | Correlation::Listener { pattern, .. } => *pattern,
        }
    }
}

/// Point-in-time view of a request's status cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestSnapshot {
    pub status: RequestStatus,
    pub result: String,
    pub error: Option<String>,
}

/// Shared status cell of one request
#[derive(Debug, Clone, Default)]
pub struct RequestHandle {
    state: Arc<Mutex<RequestSnapshot>>,
}

impl RequestHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle already failed with `reason`
    pub fn failed(reason: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.fail(reason);
        handle
    }

    /// Handle already completed with `text`
    pub fn done(text: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.complete(text);
        handle
    }

    pub fn mark_pending(&self) {
        let mut state = self.state.lock();
        if !state.status.is_finished() {
            state.status = RequestStatus::Pending;
        }
    }

    /// Record a result. Finished requests are not overwritten.
    pub fn complete(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        if state.status.is_finished() {
            return;
        }
        state.status = RequestStatus::Done;
        state.result = text.into();
    }

    /// Record a failure. Finished requests are not overwritten.
    pub fn fail(&self, reason: impl Into<String>) {
        let mut state = self.state.lock();
        if state.status.is_finished() {
            return;
        }
        state.status = RequestStatus::Error;
        state.error = Some(reason.into());
    }

    pub fn poll(&self) -> RequestSnapshot {
        self.state.lock().clone()
    }

    pub fn status(&self) -> RequestStatus {
        self.state.lock().status
    }
}

/// An outstanding recognition request
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub id: Uuid,
    pub kind: RecognitionKind,
    pub correlation: Correlation,
    pub handle: RequestHandle,
    pub submitted: Instant,
}

impl RecognitionRequest {
    pub fn new(kind: RecognitionKind, correlation: Correlation, handle: RequestHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            correlation,
            handle,
            submitted: Instant::now(),
        }
    }
}

/// Result of a finished request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "text", rename_all = "snake_case")]
pub enum Outcome {
    Recognized(String),
    Failed(String),
}

/// A finished request, dequeued in submission order
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: Uuid,
    pub kind: RecognitionKind,
    pub correlation: Correlation,
    pub outcome: Outcome,
}
