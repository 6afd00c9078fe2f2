//! Dot capture module
//!
//! Raw pen samples and the lock-free hand-off from the driver thread to the
//! interpreter. The driver callback never blocks.

pub mod types;
pub mod ring_buffer;

pub use types::*;
pub use ring_buffer::{DotConsumer, DotProducer, DotRingBuffer, RingBufferStats, SequencedDot};
