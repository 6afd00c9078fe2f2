//! Gesture classifier contract
//!
//! The point-cloud recognizer itself lives outside this crate. It receives
//! the flattened window points and the stroke count and answers with a
//! class label; an empty label means it could not decide.

use crate::stroke::StrokePoint;
use std::collections::VecDeque;

/// Class labels the dispatcher acts on
pub mod labels {
    pub const CROP_RECT: &str = "cropRect";
    pub const LARGE_CROP: &str = "largecrop";
    pub const CIRCLE: &str = "circle";
    pub const LINE: &str = "line";
    pub const TRIANGLE: &str = "triangle";

    /// Labels that mark or select a single spot on the page
    pub const MARKING: [&str; 3] = [CIRCLE, LINE, TRIANGLE];
}

/// External gesture recognizer
pub trait GestureClassifier: Send {
    /// Classify a gesture window. An empty string signals failure.
    fn classify(&mut self, points: &[StrokePoint], stroke_count: u32) -> String;
}

impl<F> GestureClassifier for F
where
    F: FnMut(&[StrokePoint], u32) -> String + Send,
{
    fn classify(&mut self, points: &[StrokePoint], stroke_count: u32) -> String {
        self(points, stroke_count)
    }
}

/// Answers with pre-recorded labels, one per call, then fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClassifier {
    labels: VecDeque<String>,
    calls: usize,
}

impl ScriptedClassifier {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            calls: 0,
        }
    }

    /// Number of times the classifier was asked
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn remaining(&self) -> usize {
        self.labels.len()
    }
}

impl GestureClassifier for ScriptedClassifier {
    fn classify(&mut self, _points: &[StrokePoint], _stroke_count: u32) -> String {
        self.calls += 1;
        self.labels.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_classifier_in_order() {
        let mut classifier = ScriptedClassifier::new([labels::CIRCLE, labels::CROP_RECT]);
        assert_eq!(classifier.classify(&[], 1), "circle");
        assert_eq!(classifier.classify(&[], 2), "cropRect");
        assert_eq!(classifier.classify(&[], 1), "");
        assert_eq!(classifier.calls(), 3);
        assert_eq!(classifier.remaining(), 0);
    }

    #[test]
    fn test_closure_classifier() {
        let mut by_count = |_: &[StrokePoint], strokes: u32| {
            if strokes > 1 {
                labels::CROP_RECT.to_string()
            } else {
                labels::LINE.to_string()
            }
        };
        assert_eq!(GestureClassifier::classify(&mut by_count, &[], 2), "cropRect");
        assert_eq!(GestureClassifier::classify(&mut by_count, &[], 1), "line");
    }
}
