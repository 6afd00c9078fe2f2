//! Lock-Free Dot Ring Buffer
//!
//! SPSC (Single Producer, Single Consumer) ring buffer between the pen driver
//! and the interpreter.
//!
//! Architecture:
//! - Producer (driver callback): never blocks; a full buffer drops the dot
//!   and counts it
//! - Consumer (interpreter thread): drains in arrival order, one dot at a time
//!   or in batches between ticks
//!
//! The core queue is the `rtrb` crate; this module adds sequencing and
//! occupancy statistics.

use super::types::Dot;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default ring buffer capacity (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// A dot tagged with its arrival sequence number
#[derive(Debug, Clone, Copy)]
pub struct SequencedDot {
    pub dot: Dot,
    pub sequence: u64,
}

/// Ring buffer statistics for monitoring
#[derive(Debug, Default)]
pub struct RingBufferStats {
    /// Total dots pushed
    pub dots_pushed: AtomicU64,
    /// Dots dropped due to full buffer
    pub dots_dropped: AtomicU64,
    /// Dots successfully consumed
    pub dots_consumed: AtomicU64,
    /// Peak buffer occupancy
    pub peak_occupancy: AtomicU64,
}

impl RingBufferStats {
    /// Fraction of pushed dots that were dropped
    pub fn drop_rate(&self) -> f64 {
        let pushed = self.dots_pushed.load(Ordering::Relaxed);
        let dropped = self.dots_dropped.load(Ordering::Relaxed);
        let total = pushed + dropped;
        if total == 0 {
            0.0
        } else {
            dropped as f64 / total as f64
        }
    }
}

/// Dot ring buffer, not yet split into its two halves
pub struct DotRingBuffer {
    producer: Producer<SequencedDot>,
    consumer: Consumer<SequencedDot>,
    stats: Arc<RingBufferStats>,
    capacity: usize,
}

impl DotRingBuffer {
    /// Create a new ring buffer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new ring buffer with specified capacity
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Ring buffer capacity must be a power of 2"
        );

        let (producer, consumer) = RingBuffer::new(capacity);

        Self {
            producer,
            consumer,
            stats: Arc::new(RingBufferStats::default()),
            capacity,
        }
    }

    /// Split into the driver-side producer and the interpreter-side consumer
    pub fn split(self) -> (DotProducer, DotConsumer) {
        (
            DotProducer {
                inner: self.producer,
                sequence: 0,
                stats: Arc::clone(&self.stats),
                capacity: self.capacity,
            },
            DotConsumer {
                inner: self.consumer,
                stats: self.stats,
            },
        )
    }

    /// Get statistics
    pub fn stats(&self) -> Arc<RingBufferStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for DotRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half (driver thread)
pub struct DotProducer {
    inner: Producer<SequencedDot>,
    sequence: u64,
    stats: Arc<RingBufferStats>,
    capacity: usize,
}

impl DotProducer {
    /// Push a dot into the ring buffer.
    ///
    /// Never blocks. If the buffer is full the dot is dropped and the drop
    /// counter is incremented.
    ///
    /// Returns true if the dot was pushed, false if dropped.
    #[inline]
    pub fn push(&mut self, dot: Dot) -> bool {
        let slot = SequencedDot {
            dot,
            sequence: self.sequence,
        };

        match self.inner.push(slot) {
            Ok(()) => {
                self.sequence += 1;
                self.stats.dots_pushed.fetch_add(1, Ordering::Relaxed);

                let occupied = (self.capacity - self.inner.slots()) as u64;
                self.stats
                    .peak_occupancy
                    .fetch_max(occupied, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.dots_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Check if buffer is full
    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Next sequence number to be assigned
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn stats(&self) -> Arc<RingBufferStats> {
        Arc::clone(&self.stats)
    }
}

/// Consumer half (interpreter thread)
pub struct DotConsumer {
    inner: Consumer<SequencedDot>,
    stats: Arc<RingBufferStats>,
}

impl DotConsumer {
    /// Pop the oldest dot
    #[inline]
    pub fn pop(&mut self) -> Option<SequencedDot> {
        match self.inner.pop() {
            Ok(slot) => {
                self.stats.dots_consumed.fetch_add(1, Ordering::Relaxed);
                Some(slot)
            }
            Err(_) => None,
        }
    }

    /// Check if there are dots available
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of dots waiting
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.slots()
    }

    /// Pop up to `max_count` dots at once
    pub fn pop_batch(&mut self, max_count: usize) -> Vec<SequencedDot> {
        let mut batch = Vec::with_capacity(max_count.min(self.available()));
        while batch.len() < max_count {
            match self.pop() {
                Some(slot) => batch.push(slot),
                None => break,
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{DotType, PagePattern};
    use crate::time::timebase::Timestamp;

    fn make_dot(millis: u64) -> Dot {
        Dot::new(
            Timestamp::from_millis(millis),
            PagePattern::new(3, 24, 0),
            10.0,
            20.0,
            DotType::PenMove,
        )
    }

    #[test]
    fn test_push_pop_in_order() {
        let (mut producer, mut consumer) = DotRingBuffer::with_capacity(16).split();

        for i in 0..5 {
            assert!(producer.push(make_dot(i)));
        }

        for i in 0..5 {
            let slot = consumer.pop().unwrap();
            assert_eq!(slot.sequence, i);
            assert_eq!(slot.dot.timestamp.as_millis(), i);
        }
        assert!(consumer.pop().is_none());
    }

    #[test]
    fn test_full_buffer_drops() {
        let buffer = DotRingBuffer::with_capacity(4);
        let stats = buffer.stats();
        let (mut producer, _consumer) = buffer.split();

        for i in 0..4 {
            assert!(producer.push(make_dot(i)));
        }
        assert!(producer.is_full());
        assert!(!producer.push(make_dot(99)));

        assert_eq!(stats.dots_pushed.load(Ordering::Relaxed), 4);
        assert_eq!(stats.dots_dropped.load(Ordering::Relaxed), 1);
        assert_eq!(stats.peak_occupancy.load(Ordering::Relaxed), 4);
        assert!((stats.drop_rate() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_dropped_dot_does_not_consume_sequence() {
        let (mut producer, mut consumer) = DotRingBuffer::with_capacity(2).split();
        producer.push(make_dot(0));
        producer.push(make_dot(1));
        assert!(!producer.push(make_dot(2)));
        assert_eq!(producer.sequence(), 2);

        consumer.pop();
        assert!(producer.push(make_dot(3)));
        consumer.pop();
        assert_eq!(consumer.pop().unwrap().sequence, 2);
    }

    #[test]
    fn test_pop_batch() {
        let (mut producer, mut consumer) = DotRingBuffer::with_capacity(16).split();
        for i in 0..10 {
            producer.push(make_dot(i));
        }

        let batch = consumer.pop_batch(4);
        assert_eq!(batch.len(), 4);
        assert_eq!(consumer.available(), 6);

        let rest = consumer.pop_batch(100);
        assert_eq!(rest.len(), 6);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_cross_thread_transfer() {
        let (mut producer, mut consumer) = DotRingBuffer::with_capacity(1024).split();

        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                while !producer.push(make_dot(i)) {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 500 {
            match consumer.pop() {
                Some(slot) => received.push(slot.dot.timestamp.as_millis()),
                None => std::thread::yield_now(),
            }
        }
        handle.join().unwrap();

        assert_eq!(received, (0..500).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn test_capacity_must_be_power_of_two() {
        let _ = DotRingBuffer::with_capacity(100);
    }
}
