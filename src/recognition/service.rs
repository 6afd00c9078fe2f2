//! Recognition Service Contract
//!
//! The interpreter hands work to a [`RecognitionService`] and gets back a
//! [`RequestHandle`] immediately; the service fills the handle in whenever
//! it finishes. Implementations must never block the caller.

use super::request::{RecognitionKind, RequestHandle, RequestStatus};
use crate::capture::types::PagePattern;
use crate::geometry::BoundingBox;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Printed text under a pen circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRequest {
    pub pattern: PagePattern,
    pub document_id: String,
    pub local_page_number: u32,
    /// Region to read (pen units)
    pub bbox: BoundingBox,
    /// Region to read (document space)
    pub region: BoundingBox,
}

/// Handwritten ink from a sticky note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandwritingRequest {
    pub pattern: PagePattern,
    /// Strokes in scaled ink coordinates
    pub strokes: Vec<Vec<(f64, f64)>>,
    /// Page size in scaled ink coordinates
    pub page_size: (f64, f64),
}

impl HandwritingRequest {
    /// Region worth rendering: the ink's bounding box grown by 20% of its
    /// width on the left and right and 40% of its height on the top and
    /// bottom, clamped to the page.
    pub fn region(&self) -> Option<BoundingBox> {
        let bbox = BoundingBox::from_points(self.strokes.iter().flatten().copied())?;
        let padded = bbox.padded(0.2, 0.4);
        Some(BoundingBox::new(
            padded.min_x.max(0.0),
            padded.min_y.max(0.0),
            padded.max_x.min(self.page_size.0),
            padded.max_y.min(self.page_size.1),
        ))
    }
}

/// External text recognition
pub trait RecognitionService: Send + Sync {
    /// Start reading printed text
    fn submit_ocr(&self, request: OcrRequest) -> RequestHandle;

    /// Start reading handwriting
    fn submit_handwriting(&self, request: HandwritingRequest) -> RequestHandle;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Service used when no recognition backend is configured
#[derive(Debug, Clone, Default)]
pub struct DisabledRecognizer;

impl DisabledRecognizer {
    const REASON: &'static str = "recognition service disabled";
}

impl RecognitionService for DisabledRecognizer {
    fn submit_ocr(&self, _request: OcrRequest) -> RequestHandle {
        RequestHandle::failed(Self::REASON)
    }

    fn submit_handwriting(&self, _request: HandwritingRequest) -> RequestHandle {
        RequestHandle::failed(Self::REASON)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// A previously observed recognition outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRecognition {
    pub kind: RecognitionKind,
    pub status: RequestStatus,
    #[serde(default)]
    pub text: String,
}

/// Answers requests from recorded outcomes, in submission order
#[derive(Debug, Default)]
pub struct ReplayRecognizer {
    outcomes: Mutex<VecDeque<RecordedRecognition>>,
}

impl ReplayRecognizer {
    pub fn new(outcomes: impl IntoIterator<Item = RecordedRecognition>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    /// Outcomes not yet handed out
    pub fn remaining(&self) -> usize {
        self.outcomes.lock().len()
    }

    fn next(&self, kind: RecognitionKind) -> RequestHandle {
        let Some(recorded) = self.outcomes.lock().pop_front() else {
            return RequestHandle::failed("no recorded outcome left");
        };
        if recorded.kind != kind {
            debug!("Replaying {} outcome for a {} request", recorded.kind, kind);
        }
        match recorded.status {
            RequestStatus::Done => RequestHandle::done(recorded.text),
            RequestStatus::Error => RequestHandle::failed(recorded.text),
            // Never finishes, as recorded
            RequestStatus::Idle | RequestStatus::Pending => {
                let handle = RequestHandle::new();
                handle.mark_pending();
                handle
            }
        }
    }
}

impl RecognitionService for ReplayRecognizer {
    fn submit_ocr(&self, _request: OcrRequest) -> RequestHandle {
        self.next(RecognitionKind::Ocr)
    }

    fn submit_handwriting(&self, _request: HandwritingRequest) -> RequestHandle {
        self.next(RecognitionKind::Handwriting)
    }

    fn name(&self) -> &str {
        "replay"
    }
}
