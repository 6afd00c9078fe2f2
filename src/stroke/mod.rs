//! Stroke assembly
//!
//! Turns the per-dot stream into strokes and multi-stroke gesture windows,
//! with early click detection while the pen is still down.

pub mod builder;
pub mod click_detector;

pub use builder::{
    FinishedStroke, MultiStrokeWindow, PageContext, Stroke, StrokeBuilder, StrokeConfig,
    StrokeEvent, StrokePoint,
};
pub use click_detector::{ClickFlag, EarlyClickDetector};
