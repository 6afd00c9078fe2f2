//! Document Catalogue
//!
//! Static description of the printed documents: per-document metadata used to
//! resolve mark payloads, and per-page mark lists. Loaded once from a JSON
//! file and split into an [`AnnotationRegistry`] and a [`DocumentCatalog`].

use super::annotation::{AnnotatedPage, AnnotationRegistry, Mark};
use crate::capture::types::PagePattern;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// What a printed sheet is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A research paper with printed marks
    #[default]
    Paper,
    /// A sticky-note sheet: handwriting box plus two search buttons per cell
    Sticky,
    /// The control sheet: a grid of view/playback buttons
    Control,
}

/// Metadata of one printed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Reference titles indexed by reference number; gaps are `None`
    #[serde(default)]
    pub references: Vec<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: DocumentKind::Paper,
            authors: Vec::new(),
            references: Vec::new(),
            source: None,
            year: None,
            pdf_link: None,
            video_link: None,
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set reference `number`, growing the list with gaps as needed
    pub fn with_reference(mut self, number: usize, title: impl Into<String>) -> Self {
        if self.references.len() <= number {
            self.references.resize(number + 1, None);
        }
        self.references[number] = Some(title.into());
        self
    }
}

/// All documents, keyed by id
#[derive(Debug, Clone, Default)]
pub struct DocumentCatalog {
    documents: HashMap<String, Document>,
}

impl DocumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: Document) -> Option<Document> {
        self.documents.insert(document.id.clone(), document)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Kind of the document, `Paper` when unknown
    pub fn kind_of(&self, id: &str) -> DocumentKind {
        self.get(id).map(|d| d.kind).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One page entry of the catalogue file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub pattern: PagePattern,
    pub document_id: String,
    pub local_page_number: u32,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

/// On-disk catalogue format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

impl CatalogFile {
    /// Parse a catalogue from JSON text
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalogue file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        debug!(
            "Loaded catalogue {:?}: {} documents, {} pages",
            path,
            catalog.documents.len(),
            catalog.pages.len()
        );
        Ok(catalog)
    }

    /// Save the catalogue as pretty JSON
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check ids are unique and every page points at a known document.
    pub fn validate(&self) -> crate::Result<()> {
        let mut ids = HashSet::new();
        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                return Err(crate::Error::Catalog("document id must not be empty".to_string()));
            }
            if !ids.insert(doc.id.as_str()) {
                return Err(crate::Error::Catalog(format!("duplicate document id '{}'", doc.id)));
            }
        }

        let mut patterns = HashSet::new();
        for page in &self.pages {
            if !patterns.insert(page.pattern) {
                return Err(crate::Error::Catalog(format!(
                    "duplicate page pattern '{}'",
                    page.pattern
                )));
            }
            if !ids.contains(page.document_id.as_str()) {
                return Err(crate::Error::Catalog(format!(
                    "page '{}' refers to unknown document '{}'",
                    page.pattern, page.document_id
                )));
            }
        }
        Ok(())
    }

    /// Split into the two runtime registries
    pub fn into_registries(self) -> (AnnotationRegistry, DocumentCatalog) {
        let mut registry = AnnotationRegistry::new();
        for entry in self.pages {
            let page = entry
                .marks
                .into_iter()
                .fold(AnnotatedPage::new(entry.document_id, entry.local_page_number), |page, mark| {
                    page.with_mark(mark)
                });
            registry.insert(entry.pattern, page);
        }

        let mut catalog = DocumentCatalog::new();
        for doc in self.documents {
            catalog.insert(doc);
        }
        (registry, catalog)
    }
}
