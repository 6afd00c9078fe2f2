//! Recognition Module
//!
//! Tracks OCR and handwriting requests from submission to completion and
//! hands finished results back in submission order.

pub mod http;
pub mod http_retry;
pub mod queue;
pub mod request;
pub mod service;
pub mod text;

pub use http::{HttpRecognizer, RecognitionConfig};
pub use http_retry::{send_with_retry, RetryPolicy};
pub use queue::RecognitionQueue;
pub use request::{
    Completion, Correlation, ListenerTag, Outcome, RecognitionKind, RecognitionRequest,
    RequestHandle, RequestSnapshot, RequestStatus,
};
pub use service::{
    DisabledRecognizer, HandwritingRequest, OcrRequest, RecognitionService, RecordedRecognition,
    ReplayRecognizer,
};
pub use text::{build_search_query, clean_ocr_text};
