//! Stabilization Layer
//!
//! Turns a stream of noisy single-frame recognition results into a stream of
//! stable phrases suitable for narration. Scoring, text similarity and box
//! geometry feed the phrase tracker; the pipeline wraps the tracker around a
//! recognizer and guards it against overlapping ticks.

pub mod geometry;
pub mod pipeline;
pub mod scorer;
pub mod similarity;
pub mod tracker;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geometry::GeometryComparator;
pub use pipeline::OcrPipeline;
pub use scorer::{CorrectionRule, ScorerConfig, TextQualityScorer};
pub use tracker::{Candidate, PhraseTracker, TrackerConfig, TrackerState};

/// Result of one tick
///
/// An empty `text` means nothing to narrate; `confidence` then carries the
/// value reached before the frame was rejected, or 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    pub text: String,
    pub confidence: i32,
}

impl Emission {
    pub fn new(text: impl Into<String>, confidence: i32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Nothing to narrate
    pub fn none() -> Self {
        Self::default()
    }

    /// Frame rejected at the given confidence
    pub fn rejected(confidence: i32) -> Self {
        Self {
            text: String::new(),
            confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<Candidate> for Emission {
    fn from(candidate: Candidate) -> Self {
        Self {
            text: candidate.text,
            confidence: candidate.confidence,
        }
    }
}

/// Pipeline-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("recognizer does not support language {0:?}")]
    UnsupportedLanguage(String),
    #[error("a tick is in progress")]
    Busy,
}
