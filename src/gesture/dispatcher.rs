//! Gesture Dispatcher
//!
//! Maps a finished gesture window to a document action. A cached early
//! click wins outright; otherwise the external classifier labels the window
//! and the first matching rule decides:
//!
//! 1. `cropRect` over several strokes, wide enough: crop the window's box.
//! 2. `largecrop` in one tall stroke next to a page edge: crop the near half
//!    of the page over the stroke's vertical span.
//! 3. `circle`, `line` or `triangle` in one stroke: click the mark under the
//!    mean point, or annotate a new pen circle and ask for OCR.
//!
//! Anything else does nothing.

use super::classifier::{labels, GestureClassifier};
use crate::capture::types::PagePattern;
use crate::geometry::{BoundingBox, PageGeometry};
use crate::hit_test::{ClickAction, HitTester};
use crate::recognition::{Correlation, ListenerTag, RecognitionKind};
use crate::registry::{AnnotationRegistry, DocumentCatalog, MarkKey};
use crate::stroke::{ClickFlag, FinishedStroke};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sheets::ControlCode;

/// Size limits for gesture dispatch, in meters on paper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Minimum box width for a crop or a new pen circle
    pub crop_min_width_m: f64,
    /// Minimum stroke height for a half-page crop
    pub large_crop_min_height_m: f64,
    /// Maximum distance from a page edge for a half-page crop
    pub edge_margin_m: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            crop_min_width_m: 0.005,
            large_crop_min_height_m: 0.01,
            edge_margin_m: 0.018,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("crop_min_width_m", self.crop_min_width_m),
            ("large_crop_min_height_m", self.large_crop_min_height_m),
            ("edge_margin_m", self.edge_margin_m),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(format!("gesture.{} must be positive, got {}", name, value));
            }
        }
        errors
    }
}

/// Page region selected by a crop gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub pattern: PagePattern,
    pub document_id: String,
    pub local_page_number: u32,
    /// Pen units
    pub bbox: BoundingBox,
    /// Document space
    pub normalized: BoundingBox,
}

/// What a dot or gesture asks the document layer to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    None,
    Click(ClickAction),
    Crop(CropRegion),
    /// A recognition request was submitted and queued
    RequestRecognition {
        kind: RecognitionKind,
        correlation: Correlation,
        /// Region being recognized (pen units)
        bbox: BoundingBox,
    },
    /// A control sheet button was pressed
    Control(ControlCode),
    /// A search was triggered with already recognized text
    Search { tag: ListenerTag, text: String },
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}

/// Gesture-to-action rules around an external classifier
pub struct GestureDispatcher {
    config: DispatchConfig,
    geometry: PageGeometry,
    classifier: Box<dyn GestureClassifier>,
}

impl GestureDispatcher {
    pub fn new(classifier: Box<dyn GestureClassifier>) -> Self {
        Self::with_config(DispatchConfig::default(), PageGeometry::default(), classifier)
    }

    pub fn with_config(
        config: DispatchConfig,
        geometry: PageGeometry,
        classifier: Box<dyn GestureClassifier>,
    ) -> Self {
        Self {
            config,
            geometry,
            classifier,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Decide what a finished stroke means.
    ///
    /// New pen circles are appended to the active page in `registry`; the
    /// caller submits the OCR request the returned action describes.
    pub fn on_stroke_finished(
        &mut self,
        finished: &FinishedStroke,
        registry: &mut AnnotationRegistry,
        catalog: &DocumentCatalog,
        hit_tester: &HitTester,
    ) -> Action {
        if let ClickFlag::Hit(action) = &finished.click {
            debug!("Early click on {} {}, skipping classification", action.kind, action.mark_id);
            return Action::Click(action.clone());
        }

        let Some(pattern) = finished.active_page else {
            debug!("Stroke finished with no active page");
            return Action::None;
        };
        let Some((document_id, local_page_number)) = registry
            .get(&pattern)
            .map(|page| (page.document_id.clone(), page.local_page_number))
        else {
            return Action::None;
        };

        let window = &finished.window;
        let label = self.classifier.classify(&window.points, window.stroke_count);
        if label.is_empty() {
            warn!("{}", crate::Error::ClassifierFailure);
            return Action::None;
        }

        let bbox = window.bounding_box;
        let (mean_x, mean_y) = window.mean_point();
        let width_m = self.geometry.to_meters(bbox.width());
        debug!(
            "Gesture '{}' over {} strokes, width {:.4} m, mean ({:.1}, {:.1})",
            label, window.stroke_count, width_m, mean_x, mean_y
        );

        let crop = |bbox: BoundingBox| {
            Action::Crop(CropRegion {
                pattern,
                document_id: document_id.clone(),
                local_page_number,
                bbox,
                normalized: self.geometry.normalize_box(&bbox),
            })
        };

        if label == labels::CROP_RECT
            && window.stroke_count > 1
            && width_m > self.config.crop_min_width_m
        {
            return crop(bbox);
        }

        if label == labels::LARGE_CROP
            && window.stroke_count == 1
            && self.geometry.to_meters(bbox.height()) > self.config.large_crop_min_height_m
            && self.geometry.edge_distance_m(mean_x) <= self.config.edge_margin_m
        {
            let mid = self.geometry.mid_x();
            let half = if mean_x < mid {
                BoundingBox::new(bbox.min_x, bbox.min_y, mid, bbox.max_y)
            } else {
                BoundingBox::new(mid, bbox.min_y, bbox.max_x, bbox.max_y)
            };
            return crop(half);
        }

        if labels::MARKING.contains(&label.as_str()) && window.stroke_count == 1 {
            return self.mark_or_annotate(pattern, (mean_x, mean_y), bbox, registry, catalog, hit_tester);
        }

        debug!("No rule for '{}' over {} strokes", label, window.stroke_count);
        Action::None
    }

    fn mark_or_annotate(
        &self,
        pattern: PagePattern,
        (x, y): (f64, f64),
        bbox: BoundingBox,
        registry: &mut AnnotationRegistry,
        catalog: &DocumentCatalog,
        hit_tester: &HitTester,
    ) -> Action {
        let hit = registry
            .get(&pattern)
            .and_then(|page| hit_tester.click_at(page, catalog, x, y));
        match hit {
            Some(Ok(action)) => return Action::Click(action),
            Some(Err(reason)) => {
                warn!("Gesture at ({:.1}, {:.1}) dropped: {}", x, y, crate::Error::from(reason));
                return Action::None;
            }
            None => {}
        }

        if self.geometry.to_meters(bbox.width()) <= self.config.crop_min_width_m {
            debug!("Mark too small to annotate at ({:.1}, {:.1})", x, y);
            return Action::None;
        }

        let key = MarkKey::from_position(x, y);
        let Some(page) = registry.get_mut(&pattern) else {
            return Action::None;
        };
        if page.add_pen_circle(key).is_none() {
            debug!("Pen circle at {} already exists on {}", key, pattern);
            return Action::None;
        }

        debug!("New pen circle at {} on {}", key, pattern);
        Action::RequestRecognition {
            kind: RecognitionKind::Ocr,
            correlation: Correlation::Mark { pattern, key },
            bbox,
        }
    }
}
