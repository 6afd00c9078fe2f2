//! Page Annotations
//!
//! Every known printed page owns an ordered list of interactive marks. The
//! printed ones (titles, authors, references, figures, tables) come from the
//! catalogue; PEN_CIRCLE marks are added at runtime when the user circles
//! text that no printed mark covers.

use crate::capture::types::PagePattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payload of a PEN_CIRCLE mark whose text recognition is still in flight
pub const PENDING_PAYLOAD: &str = "...";

/// Kind of interactive mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkKind {
    Title,
    Author,
    Reference,
    Figure,
    Table,
    PenCircle,
}

impl MarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkKind::Title => "TITLE",
            MarkKind::Author => "AUTHOR",
            MarkKind::Reference => "REFERENCE",
            MarkKind::Figure => "FIGURE",
            MarkKind::Table => "TABLE",
            MarkKind::PenCircle => "PEN_CIRCLE",
        }
    }
}

impl std::fmt::Display for MarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer pen-unit position identifying a mark on its page.
///
/// Doubles as the correlation key of an OCR request raised for a PEN_CIRCLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkKey {
    pub x: i32,
    pub y: i32,
}

impl MarkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Truncate a floating pen-unit position toward zero
    pub fn from_position(x: f64, y: f64) -> Self {
        Self::new(x as i32, y as i32)
    }
}

impl std::fmt::Display for MarkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A registered interactive region on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: MarkKind,
    /// Line index for TITLE, author index for AUTHOR, reference number for
    /// REFERENCE, free identifier for PEN_CIRCLE
    pub id: u32,
    /// Position (pen units)
    pub x: i32,
    pub y: i32,
    /// Resolved text for PEN_CIRCLE marks; empty until resolved
    #[serde(default)]
    pub payload: String,
}

impl Mark {
    pub fn new(kind: MarkKind, id: u32, x: i32, y: i32) -> Self {
        Self {
            kind,
            id,
            x,
            y,
            payload: String::new(),
        }
    }

    /// A fresh PEN_CIRCLE awaiting recognition
    pub fn pen_circle(id: u32, key: MarkKey) -> Self {
        Self {
            kind: MarkKind::PenCircle,
            id,
            x: key.x,
            y: key.y,
            payload: PENDING_PAYLOAD.to_string(),
        }
    }

    pub fn key(&self) -> MarkKey {
        MarkKey::new(self.x, self.y)
    }

    /// Check if this PEN_CIRCLE is still waiting on recognition
    pub fn is_pending(&self) -> bool {
        self.kind == MarkKind::PenCircle && self.payload == PENDING_PAYLOAD
    }
}

/// One known physical page and its marks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedPage {
    pub document_id: String,
    pub local_page_number: u32,
    marks: Vec<Mark>,
    /// Next identifier handed to a runtime PEN_CIRCLE
    #[serde(skip)]
    next_circle_id: u32,
}

impl AnnotatedPage {
    pub fn new(document_id: impl Into<String>, local_page_number: u32) -> Self {
        Self {
            document_id: document_id.into(),
            local_page_number,
            marks: Vec::new(),
            next_circle_id: 0,
        }
    }

    /// Builder-style mark insertion, in registry order
    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.push_mark(mark);
        self
    }

    pub fn push_mark(&mut self, mark: Mark) {
        if mark.kind == MarkKind::PenCircle {
            self.next_circle_id = self.next_circle_id.max(mark.id.saturating_add(1));
        }
        self.marks.push(mark);
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn pen_circle(&self, key: MarkKey) -> Option<&Mark> {
        self.marks
            .iter()
            .find(|m| m.kind == MarkKind::PenCircle && m.key() == key)
    }

    pub fn pen_circle_mut(&mut self, key: MarkKey) -> Option<&mut Mark> {
        self.marks
            .iter_mut()
            .find(|m| m.kind == MarkKind::PenCircle && m.key() == key)
    }

    /// Append a pending PEN_CIRCLE at `key`.
    ///
    /// Returns `None` when a PEN_CIRCLE already occupies that position; at
    /// most one may exist per key.
    pub fn add_pen_circle(&mut self, key: MarkKey) -> Option<&Mark> {
        if self.pen_circle(key).is_some() {
            return None;
        }
        let mark = Mark::pen_circle(self.next_circle_id, key);
        self.push_mark(mark);
        self.marks.last()
    }

    /// Remove the PEN_CIRCLE at `key`, if any.
    pub fn remove_pen_circle(&mut self, key: MarkKey) -> Option<Mark> {
        let index = self
            .marks
            .iter()
            .rposition(|m| m.kind == MarkKind::PenCircle && m.key() == key)?;
        Some(self.marks.remove(index))
    }
}

/// All known pages, keyed by pattern
#[derive(Debug, Clone, Default)]
pub struct AnnotationRegistry {
    pages: HashMap<PagePattern, AnnotatedPage>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page. Returns the page previously registered under the
    /// same pattern, if any.
    pub fn insert(&mut self, pattern: PagePattern, page: AnnotatedPage) -> Option<AnnotatedPage> {
        self.pages.insert(pattern, page)
    }

    pub fn get(&self, pattern: &PagePattern) -> Option<&AnnotatedPage> {
        self.pages.get(pattern)
    }

    pub fn get_mut(&mut self, pattern: &PagePattern) -> Option<&mut AnnotatedPage> {
        self.pages.get_mut(pattern)
    }

    pub fn contains(&self, pattern: &PagePattern) -> bool {
        self.pages.contains_key(pattern)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages sorted by pattern
    pub fn iter_sorted(&self) -> Vec<(&PagePattern, &AnnotatedPage)> {
        let mut pages: Vec<_> = self.pages.iter().collect();
        pages.sort_by_key(|(pattern, _)| **pattern);
        pages
    }
}
