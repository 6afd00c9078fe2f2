//! Document listener
//!
//! Notifications for the document layer (viewer, search, layout). The
//! interpreter calls these synchronously from the dot-processing thread.

use crate::geometry::BoundingBox;
use crate::gesture::ControlCode;
use crate::recognition::{build_search_query, ListenerTag, RecognitionKind};
use crate::registry::MarkKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Receiver of document-level events
pub trait DocumentListener: Send {
    /// A printed or pen-circle mark was clicked
    fn on_click(&mut self, kind: MarkKind, payload: &str, position: (f64, f64));

    /// A page region was cropped
    fn on_crop(&mut self, document_id: &str, page: u32, bbox: &BoundingBox);

    /// A recognition request finished; `text` is empty on failure
    fn on_recognition_ready(&mut self, kind: RecognitionKind, text: &str);

    /// A search should run over `text`
    fn on_search(&mut self, _scope: ListenerTag, _text: &str) {}

    /// A control sheet button was pressed
    fn on_control(&mut self, _code: ControlCode) {}
}

/// One listener notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ListenerEvent {
    Click {
        kind: MarkKind,
        payload: String,
        position: (f64, f64),
    },
    Crop {
        document_id: String,
        page: u32,
        bbox: BoundingBox,
    },
    RecognitionReady {
        kind: RecognitionKind,
        text: String,
    },
    Search {
        scope: ListenerTag,
        text: String,
    },
    Control {
        code: ControlCode,
    },
}

/// Collects notifications; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ListenerEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything received so far
    pub fn take(&self) -> Vec<ListenerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: ListenerEvent) {
        self.events.lock().push(event);
    }
}

impl DocumentListener for RecordingListener {
    fn on_click(&mut self, kind: MarkKind, payload: &str, position: (f64, f64)) {
        self.push(ListenerEvent::Click {
            kind,
            payload: payload.to_string(),
            position,
        });
    }

    fn on_crop(&mut self, document_id: &str, page: u32, bbox: &BoundingBox) {
        self.push(ListenerEvent::Crop {
            document_id: document_id.to_string(),
            page,
            bbox: *bbox,
        });
    }

    fn on_recognition_ready(&mut self, kind: RecognitionKind, text: &str) {
        self.push(ListenerEvent::RecognitionReady {
            kind,
            text: text.to_string(),
        });
    }

    fn on_search(&mut self, scope: ListenerTag, text: &str) {
        self.push(ListenerEvent::Search {
            scope,
            text: text.to_string(),
        });
    }

    fn on_control(&mut self, code: ControlCode) {
        self.push(ListenerEvent::Control { code });
    }
}

/// Reports every notification through the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl DocumentListener for LoggingListener {
    fn on_click(&mut self, kind: MarkKind, payload: &str, position: (f64, f64)) {
        info!("Click on {} '{}' at ({:.1}, {:.1})", kind, payload, position.0, position.1);
    }

    fn on_crop(&mut self, document_id: &str, page: u32, bbox: &BoundingBox) {
        info!(
            "Crop of {} page {}: ({:.1}, {:.1}) - ({:.1}, {:.1})",
            document_id, page, bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
        );
    }

    fn on_recognition_ready(&mut self, kind: RecognitionKind, text: &str) {
        if text.is_empty() {
            info!("{} recognition produced no text", kind);
        } else {
            info!("{} recognition ready: '{}'", kind, text);
        }
    }

    fn on_search(&mut self, scope: ListenerTag, text: &str) {
        match build_search_query(text) {
            Some(query) => info!("Search ({}) for '{}': {}", scope.as_str(), text, query),
            None => warn!("Search ({}) for '{}' has no usable words", scope.as_str(), text),
        }
    }

    fn on_control(&mut self, code: ControlCode) {
        info!("Control command: {}", code);
    }
}
