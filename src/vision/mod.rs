//! Vision/OCR Layer
//!
//! Data model for single-frame text recognition results and the boundary
//! trait for the recognition engine. The engine itself is a black box: it
//! receives a frame and returns lines of words with bounding boxes and an
//! optional skew angle.

pub mod replay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::frame::CapturedFrame;

pub use replay::ReplayRecognizer;

/// Axis-aligned bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (x)
    pub left: f64,
    /// Top edge (y)
    pub top: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box from its left/top corner and size
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge (x + width)
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge (y + height)
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        BoundingBox {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }
}

/// A single recognized word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// Word text as reported by the engine
    pub text: String,
    /// Word bounding box
    pub bounds: BoundingBox,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// An ordered line of recognized words
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub words: Vec<RecognizedWord>,
}

impl RecognizedLine {
    pub fn new(words: Vec<RecognizedWord>) -> Self {
        Self { words }
    }
}

/// Full recognizer output for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Recognized lines, top to bottom
    #[serde(default)]
    pub lines: Vec<RecognizedLine>,
    /// Overall recognized text as reported by the engine
    #[serde(default)]
    pub text: String,
    /// Detected text skew in degrees, if the engine reports one
    #[serde(default)]
    pub text_angle: Option<f64>,
}

impl RecognitionResult {
    /// Build a result from lines, deriving the overall text
    pub fn from_lines(lines: Vec<RecognizedLine>) -> Self {
        let text = lines
            .iter()
            .map(|line| {
                line.words
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            lines,
            text,
            text_angle: None,
        }
    }

    /// Set the reported skew angle
    pub fn with_angle(mut self, degrees: f64) -> Self {
        self.text_angle = Some(degrees);
        self
    }

    /// All words across all lines, in reading order
    pub fn words(&self) -> impl Iterator<Item = &RecognizedWord> {
        self.lines.iter().flat_map(|line| line.words.iter())
    }

    /// Total number of words across all lines
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|line| line.words.len()).sum()
    }

    /// Union of every word box, `None` when there are no words
    pub fn union_box(&self) -> Option<BoundingBox> {
        self.words()
            .map(|w| w.bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Height of the tallest word box
    pub fn tallest_word_height(&self) -> f64 {
        self.words().map(|w| w.bounds.height).fold(0.0, f64::max)
    }

    /// True when any word box here equals a word box in `other` exactly
    pub fn shares_word_box_with(&self, other: &RecognitionResult) -> bool {
        self.words()
            .any(|word| other.words().any(|prev| prev.bounds == word.bounds))
    }
}

/// Errors reported by a recognition engine
#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("unsupported operation")]
    Unsupported,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    Engine(String),
}

/// Single-frame text recognition engine
///
/// `Ok(None)` is the engine-level null result: recognition ran but produced
/// nothing at all, which is distinct from a result with zero lines.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Whether the engine can recognize the given language tag
    fn supports_language(&self, language: &str) -> bool;

    /// Recognize text in a frame
    async fn recognize(
        &self,
        frame: &CapturedFrame,
    ) -> Result<Option<RecognitionResult>, RecognizerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: f64, top: f64, width: f64, height: f64) -> RecognizedWord {
        RecognizedWord::new(text, BoundingBox::new(left, top, width, height))
    }

    #[test]
    fn test_union_box_spans_all_lines() {
        let result = RecognitionResult::from_lines(vec![
            RecognizedLine::new(vec![word("Tot", 10.0, 10.0, 40.0, 20.0)]),
            RecognizedLine::new(vec![word("ziens", 30.0, 35.0, 80.0, 22.0)]),
        ]);

        let union = result.union_box().unwrap();
        assert_eq!(union, BoundingBox::new(10.0, 10.0, 100.0, 47.0));
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.text, "Tot\nziens");
    }

    #[test]
    fn test_union_box_empty() {
        let result = RecognitionResult::from_lines(vec![RecognizedLine::default()]);
        assert!(result.union_box().is_none());
        assert_eq!(result.tallest_word_height(), 0.0);
    }

    #[test]
    fn test_tallest_word_height() {
        let result = RecognitionResult::from_lines(vec![RecognizedLine::new(vec![
            word("a", 0.0, 0.0, 10.0, 12.0),
            word("b", 12.0, 0.0, 10.0, 31.5),
        ])]);
        assert_eq!(result.tallest_word_height(), 31.5);
    }

    #[test]
    fn test_shares_word_box_requires_exact_match() {
        let a = RecognitionResult::from_lines(vec![RecognizedLine::new(vec![
            word("Hallo", 10.0, 10.0, 50.0, 20.0),
            word("daar", 65.0, 10.0, 40.0, 20.0),
        ])]);
        let b = RecognitionResult::from_lines(vec![RecognizedLine::new(vec![
            word("Hal1o", 10.0, 10.0, 50.0, 20.0),
        ])]);
        let c = RecognitionResult::from_lines(vec![RecognizedLine::new(vec![
            word("Hallo", 10.5, 10.0, 50.0, 20.0),
        ])]);

        assert!(b.shares_word_box_with(&a));
        assert!(!c.shares_word_box_with(&a));
    }

    #[test]
    fn test_result_json_defaults() {
        let json = r#"{ "lines": [ { "words": [ { "text": "hoi", "bounds": { "left": 1, "top": 2, "width": 3, "height": 4 } } ] } ] }"#;
        let result: RecognitionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.word_count(), 1);
        assert!(result.text_angle.is_none());
        assert!(result.text.is_empty());
    }
}
