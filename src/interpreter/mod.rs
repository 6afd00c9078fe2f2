//! Interpreter
//!
//! Wires the stroke builder, gesture dispatcher and recognition queue
//! together around owned registries, and reports to a document listener.

pub mod engine;
pub mod listener;
pub mod recording;

pub use engine::{InterpreterConfig, ListenerState, PenInterpreter};
pub use listener::{DocumentListener, ListenerEvent, LoggingListener, RecordingListener};
pub use recording::{DotRecording, RecordingMetadata, CURRENT_FORMAT_VERSION};
