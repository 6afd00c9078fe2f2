//! Head-of-Line Recognition Queue
//!
//! Requests run concurrently but are applied strictly in submission order:
//! only the head is ever inspected, and a request that finishes early waits
//! inside its handle until everything ahead of it has been consumed.
//!
//! A head that never finishes blocks the queue. An optional head timeout
//! force-fails it instead.

use super::request::{Completion, Outcome, RecognitionRequest, RequestSnapshot, RequestStatus};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

/// FIFO of outstanding recognition requests
#[derive(Debug, Default)]
pub struct RecognitionQueue {
    pending: VecDeque<RecognitionRequest>,
    head_timeout: Option<Duration>,
}

impl RecognitionQueue {
    /// Strict queue: a stuck head blocks forever
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that force-fails a head older than `timeout`
    pub fn with_head_timeout(timeout: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            head_timeout: Some(timeout),
        }
    }

    pub fn enqueue(&mut self, request: RecognitionRequest) {
        debug!(
            "Queued {} request {} ({} ahead)",
            request.kind,
            request.id,
            self.pending.len()
        );
        self.pending.push_back(request);
    }

    /// Dequeue the head if it has finished.
    pub fn poll(&mut self) -> Option<Completion> {
        let head = self.pending.front()?;
        let snapshot = head.handle.poll();

        if !snapshot.status.is_finished() {
            let timeout = self.head_timeout?;
            if head.submitted.elapsed() < timeout {
                return None;
            }
            warn!(
                "{} request {} stuck at head of queue for {:?}, failing it",
                head.kind, head.id, timeout
            );
            head.handle.fail(crate::Error::QueueStarvation(head.id.to_string()).to_string());
        }

        let request = self.pending.pop_front()?;
        // Re-read: a worker result may have landed before the forced failure
        let snapshot = request.handle.poll();
        Some(Self::completion(request, snapshot))
    }

    /// Dequeue every finished request at the head, in order.
    pub fn drain_ready(&mut self) -> Vec<Completion> {
        std::iter::from_fn(|| self.poll()).collect()
    }

    fn completion(request: RecognitionRequest, snapshot: RequestSnapshot) -> Completion {
        let outcome = match snapshot.status {
            RequestStatus::Done => Outcome::Recognized(snapshot.result),
            _ => Outcome::Failed(
                snapshot
                    .error
                    .unwrap_or_else(|| "recognition failed".to_string()),
            ),
        };
        Completion {
            id: request.id,
            kind: request.kind,
            correlation: request.correlation,
            outcome,
        }
    }

    /// Status of the head request, if any
    pub fn head_status(&self) -> Option<RequestStatus> {
        self.pending.front().map(|r| r.handle.status())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
