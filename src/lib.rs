//! # Pen Interpreter
//!
//! Turns the dot stream of a digital pen writing on printed documents into
//! document actions: clicks on titles, authors and references, region crops,
//! and pen-circle annotations whose text is read by an external OCR service.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pen_interpreter::{CatalogFile, PenInterpreter, RecordingListener};
//! use pen_interpreter::gesture::ScriptedClassifier;
//! use pen_interpreter::recognition::DisabledRecognizer;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let (registry, catalog) = CatalogFile::load(Path::new("data/catalog.json"))?.into_registries();
//! let listener = RecordingListener::new();
//! let mut interpreter = PenInterpreter::new(
//!     registry,
//!     catalog,
//!     Box::new(ScriptedClassifier::new(["circle"])),
//!     Arc::new(DisabledRecognizer),
//!     Box::new(listener.clone()),
//! );
//!
//! // for dot in dots { interpreter.on_dot(&dot); }
//! interpreter.tick();
//! println!("{:?}", listener.events());
//! # Ok::<(), pen_interpreter::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`time`]: millisecond timestamps carried by every dot
//! - [`geometry`]: pen units, meters and normalized document coordinates
//! - [`capture`]: dot samples and the lock-free driver hand-off
//! - [`registry`]: per-page marks and document metadata
//! - [`stroke`]: strokes, multi-stroke windows and early click detection
//! - [`hit_test`]: nearest-mark lookup with per-kind thresholds
//! - [`gesture`]: classifier contract, dispatch rules and sheet decoders
//! - [`recognition`]: head-of-line ordered OCR and handwriting requests
//! - [`interpreter`]: the engine tying it all together
//! - [`app`]: CLI and configuration management
//!
//! ## Dot Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Pen driver  │───▶│ Ring Buffer │───▶│   Stroke    │───▶│   Gesture   │
//! │  (capture)  │    │ (lock-free) │    │   Builder   │    │ Dispatcher  │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Document   │◀───│ Annotation  │◀───│ Recognition │◀───│  OCR / HWR  │
//! │  Listener   │    │  Registry   │    │    Queue    │    │   service   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod time;
pub mod geometry;
pub mod capture;
pub mod registry;
pub mod stroke;
pub mod hit_test;
pub mod gesture;
pub mod recognition;
pub mod interpreter;
pub mod app;

use registry::MarkKind;

// Re-export commonly used types
pub use capture::types::{Dot, DotType, PagePattern};
pub use capture::ring_buffer::DotRingBuffer;
pub use gesture::Action;
pub use interpreter::{DocumentListener, DotRecording, PenInterpreter, RecordingListener};
pub use registry::{AnnotationRegistry, CatalogFile, DocumentCatalog};
pub use time::timebase::Timestamp;

/// Result type alias for the pen interpreter
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the pen interpreter
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown page pattern: {0}")]
    UnknownPage(String),

    #[error("{kind} index {id} out of range ({len} entries)")]
    IndexOutOfRange { kind: MarkKind, id: u32, len: usize },

    #[error("Gesture classifier returned no class")]
    ClassifierFailure,

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Recognition queue starvation: request {0} never completed")]
    QueueStarvation(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Ring buffer error: {0}")]
    RingBuffer(String),

    #[error("Mark not clickable: {0}")]
    NotClickable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
