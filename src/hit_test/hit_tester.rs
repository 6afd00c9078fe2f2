//! Nearest-Mark Hit Testing
//!
//! A pen position hits a mark when it lies on the mark's printed line
//! (vertical distance below a universal line threshold) and horizontally
//! close enough for the mark's kind. Reference numbers are tiny, titles span
//! the page, so each kind has its own horizontal reach. Among eligible marks
//! the smallest Manhattan distance wins; the first registered mark wins ties.

use crate::geometry::{to_normalized, PageGeometry};
use crate::registry::{AnnotatedPage, DocumentCatalog, Mark, MarkKey, MarkKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hit thresholds in meters on paper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitThresholds {
    /// Maximum vertical distance for any mark
    pub line: f64,
    /// Horizontal reach of REFERENCE marks
    pub reference: f64,
    /// Horizontal reach of TITLE marks
    pub title: f64,
    /// Horizontal reach of AUTHOR marks
    pub author: f64,
    /// Horizontal reach of PEN_CIRCLE marks
    pub pen_circle: f64,
}

impl Default for HitThresholds {
    fn default() -> Self {
        Self {
            line: 0.012,
            reference: 0.013,
            title: 0.15,
            author: 0.04,
            pen_circle: 0.04,
        }
    }
}

impl HitThresholds {
    /// Horizontal reach for a kind; FIGURE and TABLE marks are never hit.
    pub fn reach(&self, kind: MarkKind) -> Option<f64> {
        match kind {
            MarkKind::Reference => Some(self.reference),
            MarkKind::Title => Some(self.title),
            MarkKind::Author => Some(self.author),
            MarkKind::PenCircle => Some(self.pen_circle),
            MarkKind::Figure | MarkKind::Table => None,
        }
    }

    /// Validate threshold ordering. Returns a list of problems (empty if valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("line", self.line),
            ("reference", self.reference),
            ("title", self.title),
            ("author", self.author),
            ("pen_circle", self.pen_circle),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(format!("{} threshold must be positive, got {}", name, value));
            }
        }
        if self.reference > self.author || self.author > self.title {
            errors.push(format!(
                "thresholds must satisfy reference <= author <= title, got {} / {} / {}",
                self.reference, self.author, self.title
            ));
        }
        errors
    }
}

/// Why a found mark cannot be clicked
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotEligible {
    #[error("{kind} {id} is beyond the document's {len} entries")]
    IndexOutOfRange { kind: MarkKind, id: u32, len: usize },

    #[error("reference {0} has no title in the catalogue")]
    MissingReference(u32),

    #[error("document '{0}' is not in the catalogue")]
    UnknownDocument(String),

    #[error("pen circle has no payload")]
    EmptyPayload,

    #[error("{0} marks are not clickable")]
    UnsupportedKind(MarkKind),
}

impl From<NotEligible> for crate::Error {
    fn from(reason: NotEligible) -> Self {
        match reason {
            NotEligible::IndexOutOfRange { kind, id, len } => {
                crate::Error::IndexOutOfRange { kind, id, len }
            }
            NotEligible::UnknownDocument(id) => {
                crate::Error::Catalog(format!("document '{}' is not in the catalogue", id))
            }
            other => crate::Error::NotClickable(other.to_string()),
        }
    }
}

/// Document-level event raised by clicking a mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickAction {
    pub kind: MarkKind,
    pub mark_id: u32,
    pub mark_key: MarkKey,
    /// Resolved text: author name, reference title, title line id or
    /// pen-circle keyword
    pub payload: String,
    pub document_id: String,
    pub local_page_number: u32,
    /// Click position (pen units)
    pub position: (f64, f64),
    /// Click position (document space)
    pub normalized: (f64, f64),
}

/// Outcome of resolving a mark
pub type HitResult = Result<ClickAction, NotEligible>;

/// Mark lookup with per-kind distance thresholds
#[derive(Debug, Clone)]
pub struct HitTester {
    thresholds: HitThresholds,
    geometry: PageGeometry,
}

impl HitTester {
    /// Create with default thresholds and page geometry
    pub fn new() -> Self {
        Self::with_config(HitThresholds::default(), PageGeometry::default())
    }

    pub fn with_config(thresholds: HitThresholds, geometry: PageGeometry) -> Self {
        Self {
            thresholds,
            geometry,
        }
    }

    pub fn thresholds(&self) -> &HitThresholds {
        &self.thresholds
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Nearest eligible mark to `(x, y)` on `page`, or `None`.
    pub fn find_mark<'a>(&self, page: &'a AnnotatedPage, x: f64, y: f64) -> Option<&'a Mark> {
        let line = self.geometry.to_pen_units(self.thresholds.line);
        let mut best: Option<(&Mark, f64)> = None;

        for mark in page.marks() {
            let Some(reach) = self.thresholds.reach(mark.kind) else {
                continue;
            };
            let dist_x = (x - mark.x as f64).abs();
            let dist_y = (y - mark.y as f64).abs();
            if dist_y >= line || dist_x >= self.geometry.to_pen_units(reach) {
                continue;
            }

            let dist = dist_x + dist_y;
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((mark, dist));
            }
        }

        best.map(|(mark, _)| mark)
    }

    /// Resolve what clicking `mark` at `(x, y)` means.
    pub fn hit_mark(
        &self,
        page: &AnnotatedPage,
        mark: &Mark,
        catalog: &DocumentCatalog,
        x: f64,
        y: f64,
    ) -> HitResult {
        let document = || {
            catalog
                .get(&page.document_id)
                .ok_or_else(|| NotEligible::UnknownDocument(page.document_id.clone()))
        };

        let payload = match mark.kind {
            MarkKind::Title => mark.id.to_string(),
            MarkKind::Author => {
                let authors = &document()?.authors;
                authors
                    .get(mark.id as usize)
                    .cloned()
                    .ok_or(NotEligible::IndexOutOfRange {
                        kind: mark.kind,
                        id: mark.id,
                        len: authors.len(),
                    })?
            }
            MarkKind::Reference => {
                let references = &document()?.references;
                match references.get(mark.id as usize) {
                    Some(Some(title)) => title.clone(),
                    Some(None) => return Err(NotEligible::MissingReference(mark.id)),
                    None => {
                        return Err(NotEligible::IndexOutOfRange {
                            kind: mark.kind,
                            id: mark.id,
                            len: references.len(),
                        })
                    }
                }
            }
            MarkKind::PenCircle => {
                if mark.payload.is_empty() {
                    return Err(NotEligible::EmptyPayload);
                }
                mark.payload.clone()
            }
            MarkKind::Figure | MarkKind::Table => return Err(NotEligible::UnsupportedKind(mark.kind)),
        };

        debug!("Hit {} {} on '{}': {}", mark.kind, mark.id, page.document_id, payload);

        Ok(ClickAction {
            kind: mark.kind,
            mark_id: mark.id,
            mark_key: mark.key(),
            payload,
            document_id: page.document_id.clone(),
            local_page_number: page.local_page_number,
            position: (x, y),
            normalized: to_normalized(x, y),
        })
    }

    /// `find_mark` followed by `hit_mark`. `None` when nothing is in reach.
    pub fn click_at(
        &self,
        page: &AnnotatedPage,
        catalog: &DocumentCatalog,
        x: f64,
        y: f64,
    ) -> Option<HitResult> {
        let mark = self.find_mark(page, x, y)?;
        Some(self.hit_mark(page, mark, catalog, x, y))
    }
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}
