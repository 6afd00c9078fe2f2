//! Early Click Detection
//!
//! A tap on a printed mark is a short, nearly stationary stroke. Once enough
//! samples have arrived and the pen has barely moved, the middle sample is
//! hit-tested and the outcome cached for the rest of the stroke, so pen-up
//! can raise the click without asking the gesture classifier.

use super::builder::{PageContext, StrokeConfig};
use crate::capture::types::PagePattern;
use crate::hit_test::ClickAction;
use tracing::{debug, warn};

/// Cached click outcome for the current stroke
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ClickFlag {
    /// Too few samples so far
    #[default]
    NotEvaluated,
    /// Stationary tap on a clickable mark
    Hit(ClickAction),
    /// Stationary tap with nothing clickable underneath
    NoTarget,
    /// The pen moved too far to be a tap
    NotAClick,
}

impl ClickFlag {
    pub fn is_hit(&self) -> bool {
        matches!(self, ClickFlag::Hit(_))
    }
}

/// Per-stroke click detector
#[derive(Debug, Clone)]
pub struct EarlyClickDetector {
    trigger_points: usize,
    movement_threshold: f64,
    flag: ClickFlag,
}

impl EarlyClickDetector {
    pub fn new(config: &StrokeConfig) -> Self {
        Self {
            trigger_points: config.click_trigger_points,
            movement_threshold: config.click_movement_threshold,
            flag: ClickFlag::NotEvaluated,
        }
    }

    /// Forget the previous stroke's outcome
    pub fn reset(&mut self) {
        self.flag = ClickFlag::NotEvaluated;
    }

    pub fn flag(&self) -> &ClickFlag {
        &self.flag
    }

    /// Take the cached outcome, leaving `NotEvaluated` behind
    pub fn take(&mut self) -> ClickFlag {
        std::mem::take(&mut self.flag)
    }

    /// Evaluate once the stroke has enough samples.
    ///
    /// Returns the new flag the first time it is decided for this stroke,
    /// `None` otherwise.
    pub fn observe(
        &mut self,
        points: &[(f64, f64)],
        active_page: Option<PagePattern>,
        ctx: &PageContext<'_>,
    ) -> Option<&ClickFlag> {
        if self.flag != ClickFlag::NotEvaluated || points.len() < self.trigger_points {
            return None;
        }

        let (first, last) = (points[0], points[points.len() - 1]);
        let est_move_x = (last.0 - first.0).abs();
        let est_move_y = (last.1 - first.1).abs();

        self.flag = if est_move_x < self.movement_threshold && est_move_y < self.movement_threshold {
            let (x, y) = points[points.len() / 2];
            Self::classify_tap(x, y, active_page, ctx)
        } else {
            ClickFlag::NotAClick
        };
        Some(&self.flag)
    }

    fn classify_tap(
        x: f64,
        y: f64,
        active_page: Option<PagePattern>,
        ctx: &PageContext<'_>,
    ) -> ClickFlag {
        let Some(page) = active_page.and_then(|p| ctx.registry.get(&p)) else {
            return ClickFlag::NoTarget;
        };
        match ctx.hit_tester.click_at(page, ctx.catalog, x, y) {
            Some(Ok(action)) => {
                debug!("Early click on {} {} at ({:.1}, {:.1})", action.kind, action.mark_id, x, y);
                ClickFlag::Hit(action)
            }
            Some(Err(reason)) => {
                warn!("Tap at ({:.1}, {:.1}) found a mark that is not clickable: {}", x, y, reason);
                ClickFlag::NoTarget
            }
            None => ClickFlag::NoTarget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_test::HitTester;
    use crate::registry::{
        AnnotatedPage, AnnotationRegistry, Document, DocumentCatalog, Mark, MarkKind,
    };

    fn fixtures() -> (AnnotationRegistry, DocumentCatalog, HitTester) {
        let mut registry = AnnotationRegistry::new();
        registry.insert(
            PagePattern::new(3, 24, 0),
            AnnotatedPage::new("Norrie03", 1).with_mark(Mark::new(MarkKind::Author, 0, 30, 22)),
        );
        let mut catalog = DocumentCatalog::new();
        catalog.insert(Document::new("Norrie03", "t").with_authors(["Moira C. Norrie"]));
        (registry, catalog, HitTester::new())
    }

    fn tap(x: f64, y: f64, n: usize) -> Vec<(f64, f64)> {
        (0..n).map(|i| (x + i as f64 * 0.1, y)).collect()
    }

    #[test]
    fn test_waits_for_trigger_count() {
        let (registry, catalog, tester) = fixtures();
        let ctx = PageContext::new(&registry, &catalog, &tester);
        let mut detector = EarlyClickDetector::new(&StrokeConfig::default());

        assert!(detector
            .observe(&tap(30.0, 22.0, 4), Some(PagePattern::new(3, 24, 0)), &ctx)
            .is_none());
        assert_eq!(detector.flag(), &ClickFlag::NotEvaluated);
    }

    #[test]
    fn test_stationary_tap_hits_mark() {
        let (registry, catalog, tester) = fixtures();
        let ctx = PageContext::new(&registry, &catalog, &tester);
        let mut detector = EarlyClickDetector::new(&StrokeConfig::default());

        let flag = detector
            .observe(&tap(30.0, 22.0, 5), Some(PagePattern::new(3, 24, 0)), &ctx)
            .cloned()
            .unwrap();
        match flag {
            ClickFlag::Hit(action) => assert_eq!(action.payload, "Moira C. Norrie"),
            other => panic!("expected hit, got {:?}", other),
        }

        // Decided once per stroke
        assert!(detector
            .observe(&tap(30.0, 22.0, 6), Some(PagePattern::new(3, 24, 0)), &ctx)
            .is_none());
    }

    #[test]
    fn test_stationary_tap_without_target() {
        let (registry, catalog, tester) = fixtures();
        let ctx = PageContext::new(&registry, &catalog, &tester);
        let mut detector = EarlyClickDetector::new(&StrokeConfig::default());

        detector.observe(&tap(80.0, 100.0, 5), Some(PagePattern::new(3, 24, 0)), &ctx);
        assert_eq!(detector.flag(), &ClickFlag::NoTarget);
    }

    #[test]
    fn test_no_active_page_is_no_target() {
        let (registry, catalog, tester) = fixtures();
        let ctx = PageContext::new(&registry, &catalog, &tester);
        let mut detector = EarlyClickDetector::new(&StrokeConfig::default());

        detector.observe(&tap(30.0, 22.0, 5), None, &ctx);
        assert_eq!(detector.flag(), &ClickFlag::NoTarget);
    }

    #[test]
    fn test_moving_stroke_is_not_a_click() {
        let (registry, catalog, tester) = fixtures();
        let ctx = PageContext::new(&registry, &catalog, &tester);
        let mut detector = EarlyClickDetector::new(&StrokeConfig::default());

        let stroke: Vec<_> = (0..5).map(|i| (30.0 + i as f64 * 2.0, 22.0)).collect();
        detector.observe(&stroke, Some(PagePattern::new(3, 24, 0)), &ctx);
        assert_eq!(detector.flag(), &ClickFlag::NotAClick);

        assert_eq!(detector.take(), ClickFlag::NotAClick);
        assert_eq!(detector.flag(), &ClickFlag::NotEvaluated);
    }
}
