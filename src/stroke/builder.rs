//! Stroke Builder
//!
//! Groups dots into strokes (pen-down to pen-up) and strokes into
//! multi-stroke windows. A stroke that starts less than the continuation gap
//! after the previous pen-up extends the current window, so a rectangle
//! drawn in two strokes is classified as one gesture.

use super::click_detector::{ClickFlag, EarlyClickDetector};
use crate::capture::types::{Dot, DotType, PagePattern};
use crate::geometry::BoundingBox;
use crate::hit_test::HitTester;
use crate::registry::{AnnotationRegistry, DocumentCatalog};
use crate::time::timebase::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Configuration for stroke assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeConfig {
    /// Maximum pen-up to pen-down gap that continues a window (ms)
    pub multi_stroke_gap_ms: u64,
    /// Samples needed before a stroke is checked for a tap
    pub click_trigger_points: usize,
    /// Maximum first-to-last displacement of a tap (pen units)
    pub click_movement_threshold: f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            multi_stroke_gap_ms: 1000,
            click_trigger_points: 5,
            click_movement_threshold: 6.3,
        }
    }
}

impl StrokeConfig {
    /// Validate configuration values and return errors for invalid settings.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.multi_stroke_gap_ms == 0 {
            errors.push("multi_stroke_gap_ms must be > 0".to_string());
        }
        if self.click_trigger_points < 2 {
            errors.push(format!(
                "click_trigger_points must be >= 2, got {}",
                self.click_trigger_points
            ));
        }
        if !(self.click_movement_threshold > 0.0) {
            errors.push(format!(
                "click_movement_threshold must be > 0, got {}",
                self.click_movement_threshold
            ));
        }
        errors
    }
}

/// Read-only lookups the builder needs while processing a dot
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
    pub registry: &'a AnnotationRegistry,
    pub catalog: &'a DocumentCatalog,
    pub hit_tester: &'a HitTester,
}

impl<'a> PageContext<'a> {
    pub fn new(
        registry: &'a AnnotationRegistry,
        catalog: &'a DocumentCatalog,
        hit_tester: &'a HitTester,
    ) -> Self {
        Self {
            registry,
            catalog,
            hit_tester,
        }
    }
}

/// A window point tagged with the stroke it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub stroke_index: u32,
}

/// Points of one pen-down to pen-up interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub pattern: PagePattern,
    pub index: u32,
    pub points: Vec<(f64, f64)>,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
}

impl Stroke {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.iter().copied())
    }
}

/// One or more time-adjacent strokes treated as a single gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiStrokeWindow {
    pub stroke_count: u32,
    pub bounding_box: BoundingBox,
    pub points: Vec<StrokePoint>,
}

impl MultiStrokeWindow {
    /// Fresh window seeded at the first point of a stroke
    pub fn start(x: f64, y: f64, stroke_index: u32) -> Self {
        Self {
            stroke_count: 1,
            bounding_box: BoundingBox::seeded(x, y),
            points: vec![StrokePoint { x, y, stroke_index }],
        }
    }

    /// Append a point and grow the bounding box
    pub fn push(&mut self, x: f64, y: f64, stroke_index: u32) {
        self.points.push(StrokePoint { x, y, stroke_index });
        self.bounding_box.extend(x, y);
    }

    /// Mean of all points in the window
    pub fn mean_point(&self) -> (f64, f64) {
        if self.points.is_empty() {
            return self.bounding_box.center();
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        (sx / n, sy / n)
    }
}

/// A stroke that just ended, with the gesture window it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedStroke {
    pub stroke: Stroke,
    pub window: MultiStrokeWindow,
    /// Page that was active when the stroke ended
    pub active_page: Option<PagePattern>,
    pub click: ClickFlag,
}

/// Output of the builder for a single dot
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeEvent {
    /// A new stroke began
    PenDown {
        pattern: PagePattern,
        position: (f64, f64),
        /// Strokes in the window, including this one
        window_strokes: u32,
        /// The active page switched on this dot
        page_changed: bool,
    },
    /// The early click detector decided on the current stroke
    EarlyClick(ClickFlag),
    /// Pen-up closed a stroke
    StrokeFinished(FinishedStroke),
}

/// Dot-to-stroke state machine
pub struct StrokeBuilder {
    config: StrokeConfig,
    active_page: Option<PagePattern>,
    last_unknown: Option<PagePattern>,
    stroke_pattern: PagePattern,
    stroke_points: Vec<(f64, f64)>,
    stroke_started: Timestamp,
    stroke_counter: u32,
    window: Option<MultiStrokeWindow>,
    last_pen_up: Option<Timestamp>,
    pen_down: bool,
    click: EarlyClickDetector,
}

impl StrokeBuilder {
    /// Create with default config
    pub fn new() -> Self {
        Self::with_config(StrokeConfig::default())
    }

    /// Create with custom config
    pub fn with_config(config: StrokeConfig) -> Self {
        let click = EarlyClickDetector::new(&config);
        Self {
            config,
            active_page: None,
            last_unknown: None,
            stroke_pattern: PagePattern::new(0, 0, 0),
            stroke_points: Vec::new(),
            stroke_started: Timestamp::default(),
            stroke_counter: 0,
            window: None,
            last_pen_up: None,
            pen_down: false,
            click,
        }
    }

    pub fn config(&self) -> &StrokeConfig {
        &self.config
    }

    /// Registered page the pen is currently writing on
    pub fn active_page(&self) -> Option<PagePattern> {
        self.active_page
    }

    /// Current gesture window, if any stroke has started
    pub fn window(&self) -> Option<&MultiStrokeWindow> {
        self.window.as_ref()
    }

    /// Points of the stroke in progress
    pub fn current_stroke(&self) -> &[(f64, f64)] {
        &self.stroke_points
    }

    /// Process one dot, in arrival order.
    ///
    /// Motion dots extend the stroke only while the pen is down. A PEN_MOVE
    /// before any stroke has begun opens one (its pen-down was lost); hover
    /// between strokes is ignored.
    pub fn on_dot(&mut self, dot: &Dot, ctx: &PageContext<'_>) -> Option<StrokeEvent> {
        match dot.dot_type {
            DotType::PenDown => Some(self.begin_stroke(dot, ctx)),
            DotType::PenUp => self.end_stroke(dot),
            motion if motion.is_motion() => {
                if self.pen_down {
                    self.extend_stroke(dot, ctx)
                } else if self.stroke_counter == 0 && motion == DotType::PenMove {
                    Some(self.begin_stroke(dot, ctx))
                } else {
                    trace!("Ignoring {:?} dot between strokes", motion);
                    None
                }
            }
            _ => None,
        }
    }

    fn begin_stroke(&mut self, dot: &Dot, ctx: &PageContext<'_>) -> StrokeEvent {
        self.stroke_counter += 1;
        let pattern = dot.pattern();
        let page_changed = self.switch_page(pattern, ctx);

        let continues = self.last_pen_up.is_some_and(|up| {
            dot.timestamp.duration_since(up).as_millis() < self.config.multi_stroke_gap_ms
        });

        let window_strokes = match self.window.as_mut() {
            Some(window) if continues => {
                window.stroke_count += 1;
                window.push(dot.x, dot.y, self.stroke_counter);
                window.stroke_count
            }
            _ => {
                self.window = Some(MultiStrokeWindow::start(dot.x, dot.y, self.stroke_counter));
                1
            }
        };

        self.stroke_pattern = pattern;
        self.stroke_started = dot.timestamp;
        self.pen_down = true;
        self.stroke_points.clear();
        self.stroke_points.push((dot.x, dot.y));
        self.click.reset();

        debug!(
            "Stroke {} started on {} (window strokes: {})",
            self.stroke_counter, pattern, window_strokes
        );

        StrokeEvent::PenDown {
            pattern,
            position: (dot.x, dot.y),
            window_strokes,
            page_changed,
        }
    }

    /// Switch the active page if `pattern` is registered. Returns whether the
    /// active page changed.
    fn switch_page(&mut self, pattern: PagePattern, ctx: &PageContext<'_>) -> bool {
        if self.active_page == Some(pattern) {
            return false;
        }
        if ctx.registry.contains(&pattern) {
            info!("Active page switched to {}", pattern);
            self.active_page = Some(pattern);
            self.last_unknown = None;
            true
        } else {
            if self.last_unknown != Some(pattern) {
                warn!("{}, keeping active page", crate::Error::UnknownPage(pattern.to_string()));
                self.last_unknown = Some(pattern);
            }
            false
        }
    }

    fn extend_stroke(&mut self, dot: &Dot, ctx: &PageContext<'_>) -> Option<StrokeEvent> {
        self.stroke_points.push((dot.x, dot.y));
        if let Some(window) = self.window.as_mut() {
            window.push(dot.x, dot.y, self.stroke_counter);
        }

        self.click
            .observe(&self.stroke_points, self.active_page, ctx)
            .cloned()
            .map(StrokeEvent::EarlyClick)
    }

    fn end_stroke(&mut self, dot: &Dot) -> Option<StrokeEvent> {
        self.last_pen_up = Some(dot.timestamp);
        self.pen_down = false;
        if self.stroke_points.is_empty() {
            return None;
        }

        let stroke = Stroke {
            pattern: self.stroke_pattern,
            index: self.stroke_counter,
            points: std::mem::take(&mut self.stroke_points),
            started_at: self.stroke_started,
            ended_at: dot.timestamp,
        };
        let window = self.window.clone()?;

        Some(StrokeEvent::StrokeFinished(FinishedStroke {
            stroke,
            window,
            active_page: self.active_page,
            click: self.click.take(),
        }))
    }
}

impl Default for StrokeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
