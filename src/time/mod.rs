//! Millisecond timing for dot samples
//!
//! Pen drivers stamp every dot with a millisecond clock. Stroke continuation
//! only ever compares two such stamps, so the epoch is irrelevant.

pub mod timebase;

pub use timebase::{Duration, Timestamp};
