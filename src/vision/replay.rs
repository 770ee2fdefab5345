//! Scripted recognizer
//!
//! Plays back a recorded sequence of recognizer results, one per call. Used
//! by the replay CLI and by tests that need a deterministic engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

use super::{RecognitionResult, Recognizer, RecognizerError};
use crate::capture::frame::CapturedFrame;

/// Recognizer that returns pre-recorded results in order
pub struct ReplayRecognizer {
    /// Remaining results; `None` entries are engine-level null results
    script: Mutex<VecDeque<Option<RecognitionResult>>>,
    /// Language tags this recording claims to support
    languages: Vec<String>,
}

impl ReplayRecognizer {
    /// Create a replay recognizer from a list of per-frame results
    pub fn new(script: Vec<Option<RecognitionResult>>, language: &str) -> Self {
        Self {
            script: Mutex::new(script.into()),
            languages: vec![language.to_string()],
        }
    }

    /// Load a recorded session from a JSON array of results (or `null`)
    pub fn load(path: &Path, language: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {:?}", path))?;
        let script: Vec<Option<RecognitionResult>> =
            serde_json::from_str(&content).context("Failed to parse recording")?;

        info!("Loaded {} recorded frames from {:?}", script.len(), path);
        Ok(Self::new(script, language))
    }

    /// Number of results not yet played back
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Recognizer for ReplayRecognizer {
    fn supports_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    async fn recognize(
        &self,
        frame: &CapturedFrame,
    ) -> Result<Option<RecognitionResult>, RecognizerError> {
        let next = self.script.lock().pop_front();
        if frame.width == 0 || frame.height == 0 {
            return Err(RecognizerError::InvalidInput(format!(
                "empty {}x{} frame",
                frame.width, frame.height
            )));
        }
        debug!(
            "Replay: {}x{} frame -> {}",
            frame.width,
            frame.height,
            match &next {
                Some(Some(r)) => format!("{} lines", r.lines.len()),
                Some(None) => "null result".to_string(),
                None => "end of recording".to_string(),
            }
        );
        Ok(next.flatten())
    }
}
