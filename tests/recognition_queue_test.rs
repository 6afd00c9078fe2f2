//! Integration tests for recognition request ordering
//!
//! Workers finish requests on their own threads in any order; the queue
//! must still hand results out in submission order.

use pen_interpreter::capture::types::PagePattern;
use pen_interpreter::recognition::{
    Correlation, ListenerTag, Outcome, RecognitionKind, RecognitionQueue, RecognitionRequest,
    RequestHandle, RequestStatus,
};
use pen_interpreter::registry::MarkKey;
use std::thread;
use std::time::Duration;

const PAGE: PagePattern = PagePattern::new(3, 24, 1);

fn ocr_request(x: i32, handle: RequestHandle) -> RecognitionRequest {
    RecognitionRequest::new(
        RecognitionKind::Ocr,
        Correlation::Mark {
            pattern: PAGE,
            key: MarkKey::new(x, 60),
        },
        handle,
    )
}

fn pending_handle() -> RequestHandle {
    let handle = RequestHandle::new();
    handle.mark_pending();
    handle
}

#[test]
fn test_out_of_order_workers_complete_in_submission_order() {
    let mut queue = RecognitionQueue::new();
    let handles: Vec<RequestHandle> = (0..8).map(|_| pending_handle()).collect();
    for (i, handle) in handles.iter().enumerate() {
        queue.enqueue(ocr_request(i as i32 * 10, handle.clone()));
    }

    // Last submitted finishes first
    let workers: Vec<_> = handles
        .iter()
        .enumerate()
        .map(|(i, handle)| {
            let handle = handle.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis((8 - i as u64) * 5));
                handle.complete(format!("word {}", i));
            })
        })
        .collect();

    let mut completions = Vec::new();
    while completions.len() < 8 {
        completions.extend(queue.drain_ready());
        thread::sleep(Duration::from_millis(1));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    for (i, completion) in completions.iter().enumerate() {
        assert_eq!(
            completion.correlation,
            Correlation::Mark {
                pattern: PAGE,
                key: MarkKey::new(i as i32 * 10, 60)
            }
        );
        assert_eq!(completion.outcome, Outcome::Recognized(format!("word {}", i)));
    }
    assert!(queue.is_empty());
}

#[test]
fn test_stuck_head_blocks_finished_requests() {
    let mut queue = RecognitionQueue::new();
    let head = pending_handle();
    let second = pending_handle();
    queue.enqueue(ocr_request(10, head.clone()));
    queue.enqueue(ocr_request(20, second.clone()));

    let worker = thread::spawn(move || second.fail("503 Service Unavailable"));
    worker.join().unwrap();

    assert!(queue.drain_ready().is_empty());
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.head_status(), Some(RequestStatus::Pending));

    head.complete("Memex");
    let completions = queue.drain_ready();
    assert_eq!(completions.len(), 2);
    assert_eq!(completions[0].outcome, Outcome::Recognized("Memex".to_string()));
    assert_eq!(
        completions[1].outcome,
        Outcome::Failed("503 Service Unavailable".to_string())
    );
}

#[test]
fn test_head_timeout_unblocks_queue() {
    let mut queue = RecognitionQueue::with_head_timeout(Duration::from_millis(20));
    queue.enqueue(ocr_request(10, pending_handle()));
    queue.enqueue(RecognitionRequest::new(
        RecognitionKind::Handwriting,
        Correlation::Listener {
            pattern: PagePattern::new(3, 25, 0),
            tag: ListenerTag::LocalSearch,
        },
        RequestHandle::done("bush"),
    ));

    assert!(queue.drain_ready().is_empty());
    thread::sleep(Duration::from_millis(40));

    let completions = queue.drain_ready();
    assert_eq!(completions.len(), 2);
    match &completions[0].outcome {
        Outcome::Failed(reason) => assert!(reason.contains("starvation")),
        other => panic!("expected starvation failure, got {:?}", other),
    }
    assert_eq!(completions[1].kind, RecognitionKind::Handwriting);
    assert_eq!(completions[1].outcome, Outcome::Recognized("bush".to_string()));
}
