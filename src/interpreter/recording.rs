//! Dot Recordings
//!
//! Serialization format for captured pen sessions. Besides the dots, a
//! recording carries the classifier labels and recognition outcomes that
//! were observed live, so a replay reproduces the same decisions without
//! the external services.

use crate::capture::types::{Dot, DotType};
use crate::recognition::RecordedRecognition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current recording format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Recording metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingMetadata {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub dot_count: usize,
    /// First to last dot, in milliseconds
    pub duration_ms: u64,
    pub format_version: String,
}

impl RecordingMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for RecordingMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            started_at: Utc::now(),
            ended_at: None,
            dot_count: 0,
            duration_ms: 0,
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

/// A captured pen session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotRecording {
    pub metadata: RecordingMetadata,
    pub dots: Vec<Dot>,
    /// Classifier answers, in the order they were asked for
    #[serde(default)]
    pub gesture_labels: Vec<String>,
    /// Recognition outcomes, in submission order
    #[serde(default)]
    pub recognitions: Vec<RecordedRecognition>,
}

impl DotRecording {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: RecordingMetadata::new(name),
            dots: Vec::new(),
            gesture_labels: Vec::new(),
            recognitions: Vec::new(),
        }
    }

    pub fn add_dot(&mut self, dot: Dot) {
        self.dots.push(dot);
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        self.gesture_labels.push(label.into());
    }

    pub fn add_recognition(&mut self, recognition: RecordedRecognition) {
        self.recognitions.push(recognition);
    }

    /// Stamp end time, dot count and duration
    pub fn finalize(&mut self) {
        self.metadata.ended_at = Some(Utc::now());
        self.metadata.dot_count = self.dots.len();
        self.metadata.duration_ms = match (self.dots.first(), self.dots.last()) {
            (Some(first), Some(last)) => last.timestamp.duration_since(first.timestamp).as_millis(),
            _ => 0,
        };
    }

    /// Number of strokes started
    pub fn stroke_count(&self) -> usize {
        self.dots
            .iter()
            .filter(|d| d.dot_type == DotType::PenDown)
            .count()
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a recording, warning when it was written by another format version.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let recording: DotRecording = serde_json::from_str(&content)?;
        if recording.metadata.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                name = %recording.metadata.name,
                found = %recording.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Recording has different format version; some fields may use default values"
            );
        }
        Ok(recording)
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }
}

impl Default for DotRecording {
    fn default() -> Self {
        Self::new("untitled")
    }
}
