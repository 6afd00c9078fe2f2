//! Gesture dispatch
//!
//! Classifies finished stroke windows and turns them into document actions,
//! and decodes the special sheets (sticky notes, control sheets) whose
//! strokes are never classified.

pub mod classifier;
pub mod dispatcher;
pub mod sheets;

pub use classifier::{labels, GestureClassifier, ScriptedClassifier};
pub use dispatcher::{Action, CropRegion, DispatchConfig, GestureDispatcher};
pub use sheets::{decode_control, decode_sticky, locate, ControlCode, GridCell, StickyZone};
