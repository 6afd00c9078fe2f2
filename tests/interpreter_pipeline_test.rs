//! Integration tests for the dot pipeline
//!
//! Dots -> ring buffer -> stroke builder -> gesture dispatcher ->
//! recognition queue -> document listener, against the bundled catalogue.

use parking_lot::Mutex;
use pen_interpreter::capture::ring_buffer::DotRingBuffer;
use pen_interpreter::capture::types::{Dot, DotType, PagePattern};
use pen_interpreter::geometry::BoundingBox;
use pen_interpreter::gesture::{labels, Action, ControlCode, ScriptedClassifier};
use pen_interpreter::interpreter::{
    DotRecording, ListenerEvent, ListenerState, PenInterpreter, RecordingListener,
};
use pen_interpreter::recognition::{
    HandwritingRequest, ListenerTag, OcrRequest, RecognitionKind, RecognitionService,
    RecordedRecognition, ReplayRecognizer, RequestHandle, RequestStatus,
};
use pen_interpreter::registry::{CatalogFile, DocumentKind, MarkKey, MarkKind};
use pen_interpreter::time::timebase::Timestamp;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const FIRST_PAGE: PagePattern = PagePattern::new(3, 24, 0);
const BLANK_PAGE: PagePattern = PagePattern::new(3, 24, 1);
const STICKY_PAGE: PagePattern = PagePattern::new(3, 25, 0);
const CONTROL_PAGE: PagePattern = PagePattern::new(3, 25, 510);

fn catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/catalog.json")
}

fn interpreter(
    labels: &[&str],
    recognizer: Arc<dyn RecognitionService>,
) -> (PenInterpreter, RecordingListener) {
    let (registry, catalog) = CatalogFile::load(&catalog_path())
        .expect("bundled catalogue loads")
        .into_registries();
    let listener = RecordingListener::new();
    let interp = PenInterpreter::new(
        registry,
        catalog,
        Box::new(ScriptedClassifier::new(labels.iter().copied())),
        recognizer,
        Box::new(listener.clone()),
    );
    (interp, listener)
}

fn replay(outcomes: &[(RequestStatus, &str)], kind: RecognitionKind) -> Arc<ReplayRecognizer> {
    Arc::new(ReplayRecognizer::new(outcomes.iter().map(|(status, text)| {
        RecordedRecognition {
            kind,
            status: *status,
            text: text.to_string(),
        }
    })))
}

fn dot(t: u64, pattern: PagePattern, x: f64, y: f64, dot_type: DotType) -> Dot {
    Dot::new(Timestamp::from_millis(t), pattern, x, y, dot_type)
}

/// Dots of a straight stroke: pen-down, 10 moves, pen-up
fn line_dots(t0: u64, pattern: PagePattern, from: (f64, f64), to: (f64, f64)) -> Vec<Dot> {
    let mut dots: Vec<Dot> = (0..=10)
        .map(|i| {
            let f = i as f64 / 10.0;
            let dot_type = if i == 0 { DotType::PenDown } else { DotType::PenMove };
            dot(
                t0 + i * 10,
                pattern,
                from.0 + (to.0 - from.0) * f,
                from.1 + (to.1 - from.1) * f,
                dot_type,
            )
        })
        .collect();
    dots.push(dot(t0 + 105, pattern, to.0, to.1, DotType::PenUp));
    dots
}

/// Dots of a closed loop of 16 samples
fn loop_dots(t0: u64, pattern: PagePattern, cx: f64, cy: f64, r: f64) -> Vec<Dot> {
    (0..=16)
        .map(|i| {
            let a = i as f64 / 16.0 * std::f64::consts::TAU;
            let dot_type = match i {
                0 => DotType::PenDown,
                16 => DotType::PenUp,
                _ => DotType::PenMove,
            };
            dot(t0 + i * 10, pattern, cx + r * a.cos(), cy + r * a.sin(), dot_type)
        })
        .collect()
}

/// Dots of a nearly stationary tap
fn tap_dots(t0: u64, pattern: PagePattern, x: f64, y: f64) -> Vec<Dot> {
    let jitter = [0.0, 0.2, -0.1, 0.3, 0.1, -0.2, 0.0];
    let mut dots: Vec<Dot> = jitter
        .iter()
        .enumerate()
        .map(|(i, j)| {
            let dot_type = if i == 0 { DotType::PenDown } else { DotType::PenMove };
            dot(t0 + i as u64 * 10, pattern, x + j, y - j, dot_type)
        })
        .collect();
    dots.push(dot(t0 + 75, pattern, x, y, DotType::PenUp));
    dots
}

/// Feed dots and return the last action that was not `None`
fn feed(interp: &mut PenInterpreter, dots: &[Dot]) -> Action {
    dots.iter()
        .map(|d| interp.on_dot(d))
        .filter(|a| !a.is_none())
        .last()
        .unwrap_or(Action::None)
}

/// Hands out pending handles and keeps them for the test to finish
#[derive(Default)]
struct ManualRecognizer {
    handles: Mutex<Vec<RequestHandle>>,
}

impl ManualRecognizer {
    fn handle(&self, index: usize) -> RequestHandle {
        self.handles.lock()[index].clone()
    }

    fn pending(&self) -> RequestHandle {
        let handle = RequestHandle::new();
        handle.mark_pending();
        self.handles.lock().push(handle.clone());
        handle
    }
}

impl RecognitionService for ManualRecognizer {
    fn submit_ocr(&self, _request: OcrRequest) -> RequestHandle {
        self.pending()
    }

    fn submit_handwriting(&self, _request: HandwritingRequest) -> RequestHandle {
        self.pending()
    }

    fn name(&self) -> &str {
        "manual"
    }
}

#[test]
fn test_bundled_catalog_loads() {
    let file = CatalogFile::load(&catalog_path()).unwrap();
    let (registry, catalog) = file.into_registries();

    assert!(registry.contains(&FIRST_PAGE));
    assert_eq!(registry.get(&BLANK_PAGE).unwrap().local_page_number, 2);
    assert_eq!(catalog.kind_of("Sticky52"), DocumentKind::Sticky);
    assert_eq!(catalog.kind_of("Control"), DocumentKind::Control);

    let norrie = catalog.get("Norrie03").unwrap();
    assert_eq!(norrie.authors, vec!["Moira C. Norrie", "Beat Signer"]);
    assert_eq!(norrie.references[27].as_deref(), Some("OHara97"));
    assert_eq!(norrie.references[0], None);
}

#[test]
fn test_active_page_only_follows_registered_pages() {
    let (mut interp, _) = interpreter(&[], replay(&[], RecognitionKind::Ocr));
    assert_eq!(interp.active_page(), None);

    interp.on_dot(&dot(0, FIRST_PAGE, 5.0, 5.0, DotType::PenDown));
    assert_eq!(interp.active_page(), Some(FIRST_PAGE));

    interp.on_dot(&dot(10, FIRST_PAGE, 5.0, 5.0, DotType::PenUp));
    interp.on_dot(&dot(2000, PagePattern::new(9, 9, 9), 5.0, 5.0, DotType::PenDown));
    assert_eq!(interp.active_page(), Some(FIRST_PAGE));

    interp.on_dot(&dot(2010, PagePattern::new(9, 9, 9), 5.0, 5.0, DotType::PenUp));
    interp.on_dot(&dot(4000, BLANK_PAGE, 5.0, 5.0, DotType::PenDown));
    assert_eq!(interp.active_page(), Some(BLANK_PAGE));
}

#[test]
fn test_tap_on_author_clicks_without_classifier() {
    let (mut interp, listener) = interpreter(&[], replay(&[], RecognitionKind::Ocr));

    let action = feed(&mut interp, &tap_dots(0, FIRST_PAGE, 60.0, 22.0));
    match action {
        Action::Click(click) => {
            assert_eq!(click.kind, MarkKind::Author);
            assert_eq!(click.mark_id, 1);
            assert_eq!(click.payload, "Beat Signer");
        }
        other => panic!("expected author click, got {:?}", other),
    }

    match &listener.events()[..] {
        [ListenerEvent::Click { kind, payload, .. }] => {
            assert_eq!(*kind, MarkKind::Author);
            assert_eq!(payload, "Beat Signer");
        }
        other => panic!("expected one click event, got {:?}", other),
    }
}

#[test]
fn test_tap_on_reference_resolves_cited_document() {
    let (mut interp, listener) = interpreter(&[], replay(&[], RecognitionKind::Ocr));

    feed(&mut interp, &tap_dots(0, FIRST_PAGE, 35.0, 106.0));
    assert!(matches!(
        &listener.events()[..],
        [ListenerEvent::Click { kind: MarkKind::Reference, payload, .. }] if payload == "OHara97"
    ));
}

#[test]
fn test_long_gap_starts_new_window() {
    let (mut interp, listener) = interpreter(
        &[labels::CROP_RECT, labels::CROP_RECT],
        replay(&[], RecognitionKind::Ocr),
    );

    let first = feed(&mut interp, &line_dots(0, BLANK_PAGE, (10.0, 10.0), (50.0, 10.0)));
    // Pen-up of the first stroke at t = 105; next pen-down 1500 ms later
    let second = feed(&mut interp, &line_dots(1605, BLANK_PAGE, (50.0, 10.0), (50.0, 30.0)));

    assert!(first.is_none());
    assert!(second.is_none());
    assert_eq!(interp.builder().window().unwrap().stroke_count, 1);
    assert!(listener.events().is_empty());
}

#[test]
fn test_two_stroke_crop_rect() {
    let (mut interp, listener) = interpreter(
        &[labels::CROP_RECT, labels::CROP_RECT],
        replay(&[], RecognitionKind::Ocr),
    );

    feed(&mut interp, &line_dots(0, BLANK_PAGE, (10.0, 10.0), (50.0, 10.0)));
    let action = feed(&mut interp, &line_dots(300, BLANK_PAGE, (50.0, 10.0), (50.0, 30.0)));

    let expected = BoundingBox::new(10.0, 10.0, 50.0, 30.0);
    match action {
        Action::Crop(region) => {
            assert_eq!(region.document_id, "Norrie03");
            assert_eq!(region.local_page_number, 2);
            assert_eq!(region.bbox, expected);
        }
        other => panic!("expected crop, got {:?}", other),
    }
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Crop {
            document_id: "Norrie03".to_string(),
            page: 2,
            bbox: expected
        }]
    );
}

#[test]
fn test_circle_creates_one_mark_and_one_request() {
    let recognizer = replay(&[(RequestStatus::Done, "  \"Memex:\" ")], RecognitionKind::Ocr);
    let (mut interp, listener) = interpreter(&[labels::CIRCLE], recognizer);

    let action = feed(&mut interp, &loop_dots(0, BLANK_PAGE, 40.5, 60.5, 3.0));
    assert!(matches!(
        action,
        Action::RequestRecognition {
            kind: RecognitionKind::Ocr,
            ..
        }
    ));
    assert_eq!(interp.pending_requests(), 1);

    let page = interp.registry().get(&BLANK_PAGE).unwrap();
    let circles: Vec<_> = page
        .marks()
        .iter()
        .filter(|m| m.kind == MarkKind::PenCircle)
        .collect();
    assert_eq!(circles.len(), 1);
    assert_eq!(circles[0].key(), MarkKey::new(40, 60));
    assert!(circles[0].is_pending());

    assert_eq!(interp.tick().len(), 1);
    assert_eq!(interp.pending_requests(), 0);
    let mark = interp
        .registry()
        .get(&BLANK_PAGE)
        .unwrap()
        .pen_circle(MarkKey::new(40, 60))
        .unwrap();
    assert_eq!(mark.payload, "Memex");
    assert_eq!(
        listener.take(),
        vec![ListenerEvent::RecognitionReady {
            kind: RecognitionKind::Ocr,
            text: "Memex".to_string()
        }]
    );

    // Circling the resolved mark again is a click plus an online search
    let action = feed(&mut interp, &loop_dots(5000, BLANK_PAGE, 40.5, 60.5, 3.0));
    assert!(matches!(action, Action::Click(ref click) if click.payload == "Memex"));
    let events = listener.take();
    assert!(matches!(
        &events[..],
        [
            ListenerEvent::Click { kind: MarkKind::PenCircle, .. },
            ListenerEvent::Search { scope: ListenerTag::OnlineSearch, text },
        ] if text == "Memex"
    ));
}

#[test]
fn test_failed_ocr_removes_circle() {
    let recognizer = replay(&[(RequestStatus::Error, "503")], RecognitionKind::Ocr);
    let (mut interp, listener) = interpreter(&[labels::CIRCLE], recognizer);

    feed(&mut interp, &loop_dots(0, BLANK_PAGE, 40.5, 60.5, 3.0));
    interp.tick();

    let page = interp.registry().get(&BLANK_PAGE).unwrap();
    assert!(page.marks().iter().all(|m| m.kind != MarkKind::PenCircle));
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::RecognitionReady {
            kind: RecognitionKind::Ocr,
            text: String::new()
        }]
    );
}

#[test]
fn test_click_on_pending_circle_searches_once_recognized() {
    let recognizer = Arc::new(ManualRecognizer::default());
    let (mut interp, listener) =
        interpreter(&[labels::CIRCLE, labels::CIRCLE], recognizer.clone());

    feed(&mut interp, &loop_dots(0, BLANK_PAGE, 40.5, 60.5, 3.0));
    let action = feed(&mut interp, &loop_dots(5000, BLANK_PAGE, 40.5, 60.5, 3.0));
    assert!(matches!(action, Action::Click(_)));
    assert_eq!(
        interp.listener_state(),
        ListenerState::WaitingForMark {
            pattern: BLANK_PAGE,
            key: MarkKey::new(40, 60)
        }
    );
    assert!(interp.tick().is_empty());
    assert!(listener.events().is_empty());

    recognizer.handle(0).complete("Memex");
    assert_eq!(interp.tick().len(), 1);
    assert_eq!(interp.listener_state(), ListenerState::Idle);
    assert_eq!(
        listener.events(),
        vec![
            ListenerEvent::RecognitionReady {
                kind: RecognitionKind::Ocr,
                text: "Memex".to_string()
            },
            ListenerEvent::Search {
                scope: ListenerTag::OnlineSearch,
                text: "Memex".to_string()
            },
        ]
    );
}

#[test]
fn test_results_apply_in_submission_order() {
    let recognizer = Arc::new(ManualRecognizer::default());
    let (mut interp, listener) =
        interpreter(&[labels::CIRCLE, labels::CIRCLE], recognizer.clone());

    feed(&mut interp, &loop_dots(0, BLANK_PAGE, 20.5, 40.5, 3.0));
    feed(&mut interp, &loop_dots(5000, BLANK_PAGE, 60.5, 90.5, 3.0));
    assert_eq!(interp.pending_requests(), 2);

    recognizer.handle(1).complete("Bush");
    assert!(interp.tick().is_empty());
    assert!(listener.events().is_empty());

    recognizer.handle(0).complete("Memex");
    let completions = interp.tick();
    assert_eq!(completions.len(), 2);
    let texts: Vec<String> = listener
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ListenerEvent::RecognitionReady { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["Memex", "Bush"]);
}

#[test]
fn test_sticky_handwriting_then_searches() {
    let recognizer = replay(&[(RequestStatus::Done, "  memex  ")], RecognitionKind::Handwriting);
    let (mut interp, listener) = interpreter(&[], recognizer);

    // Input box of the first cell
    let action = feed(&mut interp, &line_dots(0, STICKY_PAGE, (10.0, 25.4), (20.0, 25.4)));
    assert!(action.is_none());
    let ink = interp.sticky_ink(&STICKY_PAGE);
    assert_eq!(ink.len(), 1);
    assert_eq!(ink[0][0], (100.0, 254.0));

    // Bottom button: submit the ink for an online search
    let action = feed(&mut interp, &tap_dots(2000, STICKY_PAGE, 28.0, 17.4));
    assert!(matches!(
        action,
        Action::RequestRecognition {
            kind: RecognitionKind::Handwriting,
            ..
        }
    ));
    assert_eq!(
        interp.listener_state(),
        ListenerState::Armed(ListenerTag::OnlineSearch)
    );

    interp.tick();
    assert_eq!(interp.recognized_text(), "memex");
    assert_eq!(interp.listener_state(), ListenerState::Idle);
    assert_eq!(
        listener.take(),
        vec![
            ListenerEvent::RecognitionReady {
                kind: RecognitionKind::Handwriting,
                text: "memex".to_string()
            },
            ListenerEvent::Search {
                scope: ListenerTag::OnlineSearch,
                text: "memex".to_string()
            },
        ]
    );

    // Top button with no new ink reuses the recognized text
    let action = feed(&mut interp, &tap_dots(4000, STICKY_PAGE, 28.0, 8.0));
    assert_eq!(
        action,
        Action::Search {
            tag: ListenerTag::LocalSearch,
            text: "memex".to_string()
        }
    );
    assert_eq!(interp.pending_requests(), 0);

    // Writing on another page forgets the text
    interp.on_dot(&dot(6000, BLANK_PAGE, 5.0, 5.0, DotType::PenDown));
    assert_eq!(interp.recognized_text(), "");
}

#[test]
fn test_sticky_button_without_ink_or_text_does_nothing() {
    let (mut interp, listener) = interpreter(&[], replay(&[], RecognitionKind::Handwriting));
    let action = feed(&mut interp, &tap_dots(0, STICKY_PAGE, 28.0, 8.0));
    assert!(action.is_none());
    assert!(listener.events().is_empty());
    assert_eq!(interp.pending_requests(), 0);
}

#[test]
fn test_control_sheet_codes() {
    let (mut interp, listener) = interpreter(&[labels::CIRCLE], replay(&[], RecognitionKind::Ocr));

    let action = feed(&mut interp, &tap_dots(0, CONTROL_PAGE, 40.0, 10.0));
    assert_eq!(action, Action::Control(ControlCode::SideBySide));

    let action = feed(&mut interp, &tap_dots(2000, CONTROL_PAGE, 1.0, 1.0));
    assert_eq!(action, Action::Control(ControlCode::Default));

    // Strokes on the control sheet never reach the classifier
    let action = feed(&mut interp, &loop_dots(4000, CONTROL_PAGE, 40.5, 60.5, 3.0));
    assert!(matches!(action, Action::Control(_)));
    assert_eq!(interp.pending_requests(), 0);

    let codes: Vec<ControlCode> = listener
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ListenerEvent::Control { code } => Some(code),
            _ => None,
        })
        .collect();
    assert_eq!(codes.len(), 3);
    assert_eq!(codes[0], ControlCode::SideBySide);
    assert_eq!(codes[1], ControlCode::Default);
}

#[test]
fn test_hover_over_sheets_does_nothing() {
    let recognizer = replay(&[(RequestStatus::Done, "memex")], RecognitionKind::Handwriting);
    let (mut interp, listener) = interpreter(&[], recognizer);

    // Hover over a control button before anything was written
    let hover = dot(0, CONTROL_PAGE, 40.0, 10.0, DotType::PenHover);
    assert!(interp.on_dot(&hover).is_none());
    assert_eq!(interp.active_page(), None);

    // Sticky ink is waiting; hovering over both buttons must not submit it
    feed(&mut interp, &line_dots(1000, STICKY_PAGE, (10.0, 25.4), (20.0, 25.4)));
    for (t, y) in [(1200, 17.4), (1210, 8.0), (1220, 12.0)] {
        assert!(interp.on_dot(&dot(t, STICKY_PAGE, 28.0, y, DotType::PenHover)).is_none());
    }
    assert_eq!(interp.pending_requests(), 0);
    assert_eq!(interp.listener_state(), ListenerState::Idle);

    // A real press, then hover over the control sheet again
    let action = feed(&mut interp, &tap_dots(5000, CONTROL_PAGE, 40.0, 10.0));
    assert_eq!(action, Action::Control(ControlCode::SideBySide));
    for t in [5200, 5210] {
        assert!(interp.on_dot(&dot(t, CONTROL_PAGE, 10.0, 10.0, DotType::PenHover)).is_none());
    }

    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Control {
            code: ControlCode::SideBySide
        }]
    );
    assert_eq!(interp.sticky_ink(&STICKY_PAGE).len(), 1);
}

#[test]
fn test_drain_from_ring_buffer() {
    let (mut interp, listener) = interpreter(&[], replay(&[], RecognitionKind::Ocr));
    let buffer = DotRingBuffer::with_capacity(64);
    let stats = buffer.stats();
    let (mut producer, mut consumer) = buffer.split();

    for d in tap_dots(0, FIRST_PAGE, 30.0, 22.0) {
        assert!(producer.push(d));
    }
    let actions = interp.drain(&mut consumer, 64);

    assert_eq!(actions.len(), 1);
    assert!(matches!(&actions[0], Action::Click(click) if click.payload == "Moira C. Norrie"));
    assert_eq!(listener.events().len(), 1);
    assert_eq!(stats.dots_consumed.load(std::sync::atomic::Ordering::Relaxed), 8);
    assert!(consumer.is_empty());
}

#[test]
fn test_recorded_session_replays() {
    let mut recording = DotRecording::new("circle memex");
    for d in loop_dots(0, BLANK_PAGE, 40.5, 60.5, 3.0) {
        recording.add_dot(d);
    }
    recording.add_label(labels::CIRCLE);
    recording.add_recognition(RecordedRecognition {
        kind: RecognitionKind::Ocr,
        status: RequestStatus::Done,
        text: "Memex".to_string(),
    });
    recording.finalize();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    recording.save(&path).unwrap();
    let loaded = DotRecording::load(&path).unwrap();
    assert_eq!(loaded.len(), 17);
    assert_eq!(loaded.stroke_count(), 1);
    assert_eq!(loaded.metadata.duration_ms, 160);

    let (registry, catalog) = CatalogFile::load(&catalog_path()).unwrap().into_registries();
    let listener = RecordingListener::new();
    let mut interp = PenInterpreter::new(
        registry,
        catalog,
        Box::new(ScriptedClassifier::new(loaded.gesture_labels.clone())),
        Arc::new(ReplayRecognizer::new(loaded.recognitions.clone())),
        Box::new(listener.clone()),
    );
    for d in &loaded.dots {
        interp.on_dot(d);
    }
    interp.tick();

    let mark = interp
        .registry()
        .get(&BLANK_PAGE)
        .unwrap()
        .pen_circle(MarkKey::new(40, 60))
        .unwrap();
    assert_eq!(mark.payload, "Memex");
}
