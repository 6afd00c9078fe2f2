//! Pen Interpreter
//!
//! Owns every piece of interpreter state and drives it from two inputs:
//! dots, in arrival order, and `tick()` calls that apply finished
//! recognition requests. Both run on the caller's thread; recognition work
//! itself runs wherever the [`RecognitionService`] puts it.

use crate::capture::ring_buffer::DotConsumer;
use crate::capture::types::{Dot, PagePattern};
use crate::geometry::{BoundingBox, PageGeometry};
use crate::gesture::{
    decode_control, decode_sticky, Action, CropRegion, DispatchConfig, GestureClassifier,
    GestureDispatcher, StickyZone,
};
use crate::hit_test::{ClickAction, HitTester, HitThresholds};
use crate::recognition::{
    clean_ocr_text, Completion, Correlation, HandwritingRequest, ListenerTag, OcrRequest,
    Outcome, RecognitionKind, RecognitionQueue, RecognitionRequest, RecognitionService,
};
use crate::registry::{AnnotationRegistry, DocumentCatalog, DocumentKind, MarkKey, MarkKind};
use crate::stroke::{FinishedStroke, PageContext, StrokeBuilder, StrokeConfig, StrokeEvent};
use super::listener::DocumentListener;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the interpreter can be tuned with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    pub page: PageGeometry,
    /// Factor applied to sticky-note ink before handwriting recognition
    pub ink_scale: f64,
    pub strokes: StrokeConfig,
    pub hit_test: HitThresholds,
    pub gesture: DispatchConfig,
    /// Force-fail a recognition request stuck at the queue head this long
    pub head_timeout_ms: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            ink_scale: 10.0,
            strokes: StrokeConfig::default(),
            hit_test: HitThresholds::default(),
            gesture: DispatchConfig::default(),
            head_timeout_ms: None,
        }
    }
}

/// What the listener is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerState {
    #[default]
    Idle,
    /// A pending pen circle was clicked; search once its OCR lands
    WaitingForMark { pattern: PagePattern, key: MarkKey },
    /// A sticky-note button was pressed; search once handwriting lands
    Armed(ListenerTag),
}

/// What the stroke in progress was started on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrokeSurface {
    Document,
    Sticky(Option<StickyZone>),
    Control,
}

/// Sticky-note ink and the text recognized from it
#[derive(Debug, Default)]
struct StickyState {
    ink: HashMap<PagePattern, Vec<Vec<(f64, f64)>>>,
    new_ink: HashSet<PagePattern>,
    recognized_text: String,
}

/// Dot-stream interpreter
pub struct PenInterpreter {
    config: InterpreterConfig,
    registry: AnnotationRegistry,
    catalog: DocumentCatalog,
    hit_tester: HitTester,
    builder: StrokeBuilder,
    dispatcher: GestureDispatcher,
    queue: RecognitionQueue,
    recognizer: Arc<dyn RecognitionService>,
    listener: Box<dyn DocumentListener>,
    listener_state: ListenerState,
    surface: StrokeSurface,
    sticky: StickyState,
}

impl PenInterpreter {
    /// Create with default config
    pub fn new(
        registry: AnnotationRegistry,
        catalog: DocumentCatalog,
        classifier: Box<dyn GestureClassifier>,
        recognizer: Arc<dyn RecognitionService>,
        listener: Box<dyn DocumentListener>,
    ) -> Self {
        Self::with_config(
            InterpreterConfig::default(),
            registry,
            catalog,
            classifier,
            recognizer,
            listener,
        )
    }

    /// Create with custom config
    pub fn with_config(
        config: InterpreterConfig,
        registry: AnnotationRegistry,
        catalog: DocumentCatalog,
        classifier: Box<dyn GestureClassifier>,
        recognizer: Arc<dyn RecognitionService>,
        listener: Box<dyn DocumentListener>,
    ) -> Self {
        let hit_tester = HitTester::with_config(config.hit_test, config.page);
        let builder = StrokeBuilder::with_config(config.strokes.clone());
        let dispatcher = GestureDispatcher::with_config(config.gesture, config.page, classifier);
        let queue = match config.head_timeout_ms {
            Some(ms) => RecognitionQueue::with_head_timeout(Duration::from_millis(ms)),
            None => RecognitionQueue::new(),
        };

        info!(
            "Interpreter ready: {} pages, {} documents, recognition via {}",
            registry.len(),
            catalog.len(),
            recognizer.name()
        );

        Self {
            config,
            registry,
            catalog,
            hit_tester,
            builder,
            dispatcher,
            queue,
            recognizer,
            listener,
            listener_state: ListenerState::Idle,
            surface: StrokeSurface::Document,
            sticky: StickyState::default(),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    pub fn active_page(&self) -> Option<PagePattern> {
        self.builder.active_page()
    }

    pub fn builder(&self) -> &StrokeBuilder {
        &self.builder
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener_state
    }

    /// Text last recognized from sticky-note handwriting
    pub fn recognized_text(&self) -> &str {
        &self.sticky.recognized_text
    }

    /// Sticky-note ink stored for `pattern` (scaled coordinates)
    pub fn sticky_ink(&self, pattern: &PagePattern) -> &[Vec<(f64, f64)>] {
        self.sticky.ink.get(pattern).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recognition requests not yet applied
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    /// Process one dot. Never fails: per-gesture problems are logged and
    /// yield [`Action::None`].
    pub fn on_dot(&mut self, dot: &Dot) -> Action {
        let ctx = PageContext::new(&self.registry, &self.catalog, &self.hit_tester);
        let Some(event) = self.builder.on_dot(dot, &ctx) else {
            return Action::None;
        };

        match event {
            StrokeEvent::PenDown {
                pattern,
                position,
                page_changed,
                ..
            } => self.on_pen_down(pattern, position, page_changed),
            StrokeEvent::EarlyClick(flag) => {
                debug!("Early click flag: {:?}", flag);
                Action::None
            }
            StrokeEvent::StrokeFinished(finished) => self.on_stroke_finished(finished),
        }
    }

    /// Process up to `max` dots from the driver's ring buffer, in order.
    /// Returns the actions that were not [`Action::None`].
    pub fn drain(&mut self, consumer: &mut DotConsumer, max: usize) -> Vec<Action> {
        let mut actions = Vec::new();
        for _ in 0..max {
            let Some(sequenced) = consumer.pop() else {
                break;
            };
            let action = self.on_dot(&sequenced.dot);
            if !action.is_none() {
                actions.push(action);
            }
        }
        actions
    }

    /// Apply every recognition result available at the queue head.
    pub fn tick(&mut self) -> Vec<Completion> {
        let completions = self.queue.drain_ready();
        for completion in &completions {
            self.apply_completion(completion);
        }
        completions
    }

    fn on_pen_down(&mut self, pattern: PagePattern, (x, y): (f64, f64), page_changed: bool) -> Action {
        if page_changed && !self.sticky.recognized_text.is_empty() {
            debug!("Page changed, dropping recognized text");
            self.sticky.recognized_text.clear();
        }

        let kind = self
            .registry
            .get(&pattern)
            .map(|page| self.catalog.kind_of(&page.document_id));

        match kind {
            Some(DocumentKind::Control) => {
                self.surface = StrokeSurface::Control;
                let code = decode_control(x, y);
                debug!("Control sheet {} pressed: {}", pattern, code);
                self.listener.on_control(code);
                Action::Control(code)
            }
            Some(DocumentKind::Sticky) => {
                let zone = decode_sticky(x, y);
                self.surface = StrokeSurface::Sticky(zone);
                match zone {
                    Some(StickyZone::Top) => self.sticky_button(pattern, ListenerTag::LocalSearch),
                    Some(StickyZone::Bottom) => self.sticky_button(pattern, ListenerTag::OnlineSearch),
                    Some(StickyZone::Input) | None => Action::None,
                }
            }
            Some(DocumentKind::Paper) | None => {
                self.surface = StrokeSurface::Document;
                Action::None
            }
        }
    }

    fn sticky_button(&mut self, pattern: PagePattern, tag: ListenerTag) -> Action {
        if self.sticky.new_ink.remove(&pattern) {
            let scale = self.config.ink_scale;
            let request = HandwritingRequest {
                pattern,
                strokes: self.sticky_ink(&pattern).to_vec(),
                page_size: (self.config.page.width * scale, self.config.page.height * scale),
            };
            let bbox = request
                .region()
                .map(|region| region.scaled(1.0 / scale))
                .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0));

            self.listener_state = ListenerState::Armed(tag);
            let correlation = Correlation::Listener { pattern, tag };
            let handle = self.recognizer.submit_handwriting(request);
            self.queue
                .enqueue(RecognitionRequest::new(RecognitionKind::Handwriting, correlation, handle));
            info!("Handwriting on {} submitted for {}", pattern, tag.as_str());

            return Action::RequestRecognition {
                kind: RecognitionKind::Handwriting,
                correlation,
                bbox,
            };
        }

        if !self.sticky.recognized_text.is_empty() {
            let text = self.sticky.recognized_text.clone();
            self.listener.on_search(tag, &text);
            return Action::Search { tag, text };
        }

        debug!("Sticky button {} pressed with nothing to search", tag.as_str());
        Action::None
    }

    fn on_stroke_finished(&mut self, finished: FinishedStroke) -> Action {
        match self.surface {
            StrokeSurface::Control => Action::None,
            StrokeSurface::Sticky(Some(StickyZone::Input)) => {
                let scale = self.config.ink_scale;
                let pattern = finished.stroke.pattern;
                let ink: Vec<(f64, f64)> = finished
                    .stroke
                    .points
                    .iter()
                    .map(|&(x, y)| (x * scale, y * scale))
                    .collect();
                self.sticky.ink.entry(pattern).or_default().push(ink);
                self.sticky.new_ink.insert(pattern);
                debug!(
                    "Stored sticky ink on {} ({} strokes)",
                    pattern,
                    self.sticky_ink(&pattern).len()
                );
                Action::None
            }
            StrokeSurface::Sticky(_) => Action::None,
            StrokeSurface::Document => {
                let action = self.dispatcher.on_stroke_finished(
                    &finished,
                    &mut self.registry,
                    &self.catalog,
                    &self.hit_tester,
                );
                self.apply_action(&action);
                action
            }
        }
    }

    fn apply_action(&mut self, action: &Action) {
        match action {
            Action::Click(click) => self.apply_click(click),
            Action::Crop(region) => self.apply_crop(region),
            Action::RequestRecognition {
                kind: RecognitionKind::Ocr,
                correlation: Correlation::Mark { pattern, key },
                bbox,
            } => self.submit_ocr(*pattern, *key, *bbox),
            _ => {}
        }
    }

    fn apply_click(&mut self, click: &ClickAction) {
        if click.kind == MarkKind::PenCircle && click.payload == crate::registry::PENDING_PAYLOAD {
            if let Some(pattern) = self.builder.active_page() {
                debug!("Pen circle {} still recognizing, waiting for it", click.mark_key);
                self.listener_state = ListenerState::WaitingForMark {
                    pattern,
                    key: click.mark_key,
                };
            }
            return;
        }

        self.listener.on_click(click.kind, &click.payload, click.position);
        if click.kind == MarkKind::PenCircle {
            self.listener.on_search(ListenerTag::OnlineSearch, &click.payload);
        }
    }

    fn apply_crop(&mut self, region: &CropRegion) {
        self.listener
            .on_crop(&region.document_id, region.local_page_number, &region.bbox);
    }

    fn submit_ocr(&mut self, pattern: PagePattern, key: MarkKey, bbox: BoundingBox) {
        let Some(page) = self.registry.get(&pattern) else {
            return;
        };
        let request = OcrRequest {
            pattern,
            document_id: page.document_id.clone(),
            local_page_number: page.local_page_number,
            bbox,
            region: self.config.page.normalize_box(&bbox),
        };
        let handle = self.recognizer.submit_ocr(request);
        self.queue.enqueue(RecognitionRequest::new(
            RecognitionKind::Ocr,
            Correlation::Mark { pattern, key },
            handle,
        ));
    }

    fn apply_completion(&mut self, completion: &Completion) {
        debug!(
            "{} result for {} ready",
            completion.kind,
            completion.correlation.pattern()
        );
        match completion.correlation {
            Correlation::Mark { pattern, key } => self.apply_ocr(pattern, key, &completion.outcome),
            Correlation::Listener { pattern, .. } => self.apply_handwriting(pattern, &completion.outcome),
        }
    }

    fn apply_ocr(&mut self, pattern: PagePattern, key: MarkKey, outcome: &Outcome) {
        let Some(page) = self.registry.get_mut(&pattern) else {
            warn!("OCR result for unknown page {} dropped", pattern);
            return;
        };
        let Some(mark) = page.pen_circle_mut(key) else {
            warn!("OCR result for missing pen circle {} on {} dropped", key, pattern);
            return;
        };

        let text = match outcome {
            Outcome::Recognized(raw) => clean_ocr_text(raw),
            Outcome::Failed(reason) => {
                warn!(
                    "{}",
                    crate::Error::Recognition(format!("OCR for {} on {}: {}", key, pattern, reason))
                );
                String::new()
            }
        };

        let waiting = self.listener_state == ListenerState::WaitingForMark { pattern, key };
        if text.is_empty() {
            page.remove_pen_circle(key);
            info!("Pen circle {} on {} removed, no text recognized", key, pattern);
            self.listener.on_recognition_ready(RecognitionKind::Ocr, "");
            if waiting {
                self.listener_state = ListenerState::Idle;
            }
            return;
        }

        mark.payload = text.clone();
        info!("Pen circle {} on {} recognized as '{}'", key, pattern, text);
        self.listener.on_recognition_ready(RecognitionKind::Ocr, &text);
        if waiting {
            self.listener_state = ListenerState::Idle;
            self.listener.on_search(ListenerTag::OnlineSearch, &text);
        }
    }

    fn apply_handwriting(&mut self, pattern: PagePattern, outcome: &Outcome) {
        let text = match outcome {
            Outcome::Recognized(text) => text.trim().to_string(),
            Outcome::Failed(reason) => {
                warn!(
                    "{}",
                    crate::Error::Recognition(format!("handwriting on {}: {}", pattern, reason))
                );
                String::new()
            }
        };

        let armed = match self.listener_state {
            ListenerState::Armed(tag) => Some(tag),
            _ => None,
        };
        if armed.is_some() {
            self.listener_state = ListenerState::Idle;
        }

        if text.is_empty() {
            self.listener.on_recognition_ready(RecognitionKind::Handwriting, "");
            return;
        }

        info!("Handwriting on {} recognized as '{}'", pattern, text);
        self.sticky.recognized_text = text.clone();
        self.listener.on_recognition_ready(RecognitionKind::Handwriting, &text);
        if let Some(tag) = armed {
            self.listener.on_search(tag, &text);
        }
    }
}
