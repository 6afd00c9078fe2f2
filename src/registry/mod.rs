//! Annotation and document registries
//!
//! Owned lookup tables the interpreter reads and mutates: which marks sit on
//! which physical page, and what each document's titles, authors and
//! references are. Both are loaded from a catalogue file at startup.

pub mod annotation;
pub mod catalog;

pub use annotation::{AnnotatedPage, AnnotationRegistry, Mark, MarkKey, MarkKind, PENDING_PAYLOAD};
pub use catalog::{CatalogFile, Document, DocumentCatalog, DocumentKind, PageEntry};
