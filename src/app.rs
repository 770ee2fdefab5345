//! Application Coordinator
//!
//! Wires frame preparation, the recognition pipeline and the narration queue
//! together and manages the capture session lifecycle.

use anyhow::Result;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::capture::CapturedFrame;
use crate::config::AppConfig;
use crate::narration::{NarrationQueue, Utterance};
use crate::stabilizer::{Emission, OcrPipeline, PhraseTracker, TextQualityScorer};
use crate::vision::Recognizer;

/// Main application coordinator
pub struct SubtitleReaderApp<R: Recognizer> {
    config: AppConfig,
    pipeline: OcrPipeline<R>,
    /// Channel feeding emitted phrases to the narration queue
    to_narration: Sender<Emission>,
    narration: Mutex<NarrationQueue>,
    session_active: AtomicBool,
}

impl<R: Recognizer> SubtitleReaderApp<R> {
    /// Create a new application coordinator
    ///
    /// Fails when the recognizer does not support the configured language.
    pub fn new(config: AppConfig, recognizer: R) -> Result<Self> {
        let tracker = PhraseTracker::new(
            config.tracker.clone(),
            TextQualityScorer::new(config.scorer.clone()),
            config.geometry,
        );
        let pipeline = OcrPipeline::new(recognizer, &config.capture.language, tracker)?;
        let (to_narration, narration) = NarrationQueue::new(config.narration.clone());

        Ok(Self {
            config,
            pipeline,
            to_narration,
            narration: Mutex::new(narration),
            session_active: AtomicBool::new(false),
        })
    }

    /// Start capturing with a fresh tracker and narration queue
    pub fn start_session(&self) -> Result<()> {
        self.reset()?;
        self.session_active.store(true, Ordering::Release);
        info!("Session started");
        Ok(())
    }

    /// Stop capturing and drop anything still pending
    pub fn stop_session(&self) -> Result<()> {
        self.session_active.store(false, Ordering::Release);
        self.reset()?;
        info!("Session stopped");
        Ok(())
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active.load(Ordering::Acquire)
    }

    /// Run one poll tick on a captured frame
    ///
    /// Non-empty emissions are forwarded to the narration queue.
    pub async fn tick(&self, frame: &CapturedFrame) -> Emission {
        if !self.is_session_active() {
            debug!("No active session, ignoring frame");
            return Emission::none();
        }

        let (prepared, settings) = self.config.capture.prepare(frame);
        let emission = self.pipeline.process_frame(&prepared, &settings).await;

        if !emission.is_empty() {
            info!("Emitted {:?} ({})", emission.text, emission.confidence);
            let _ = self.to_narration.send(emission.clone());
        }

        emission
    }

    /// Next phrase to speak, if any
    pub fn next_utterance(&self) -> Option<Utterance> {
        self.narration.lock().next_utterance()
    }

    /// Number of phrases waiting to be spoken
    pub fn pending_utterances(&self) -> usize {
        self.narration.lock().pending_len()
    }

    pub fn pipeline(&self) -> &OcrPipeline<R> {
        &self.pipeline
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn reset(&self) -> Result<()> {
        self.pipeline.reset()?;
        self.narration.lock().reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{
        BoundingBox, RecognitionResult, RecognizedLine, RecognizedWord, ReplayRecognizer,
    };

    fn phrase(words: &[&str], top: f64) -> Option<RecognitionResult> {
        let mut left = 10.0;
        let words = words
            .iter()
            .map(|text| {
                let width = text.chars().count() as f64 * 10.0;
                let word = RecognizedWord::new(*text, BoundingBox::new(left, top, width, 20.0));
                left += width + 5.0;
                word
            })
            .collect();
        Some(RecognitionResult::from_lines(vec![RecognizedLine::new(words)]))
    }

    fn app(script: Vec<Option<RecognitionResult>>) -> SubtitleReaderApp<ReplayRecognizer> {
        SubtitleReaderApp::new(AppConfig::default(), ReplayRecognizer::new(script, "nl")).unwrap()
    }

    #[test]
    fn test_unsupported_language_fails_construction() {
        let recognizer = ReplayRecognizer::new(vec![], "en-US");
        assert!(SubtitleReaderApp::new(AppConfig::default(), recognizer).is_err());
    }

    #[tokio::test]
    async fn test_frames_ignored_without_session() {
        let app = app(vec![phrase(&["Hallo", "daar"], 10.0)]);
        let frame = CapturedFrame::blank(640, 480);

        assert!(app.tick(&frame).await.is_empty());
        assert_eq!(app.pipeline().recognizer().remaining(), 1);
    }

    #[tokio::test]
    async fn test_session_narrates_each_phrase_once() {
        let app = app(vec![
            phrase(&["Tot", "ziens"], 10.0),
            phrase(&["Tot", "ziens"], 10.0),
            phrase(&["Nieuwe", "scene", "hier"], 60.0),
            None,
            phrase(&["Tot", "ziens"], 10.0),
            None,
        ]);
        let frame = CapturedFrame::blank(640, 480);
        app.start_session().unwrap();

        let mut emitted = Vec::new();
        for _ in 0..6 {
            let emission = app.tick(&frame).await;
            if !emission.is_empty() {
                emitted.push(emission.text);
            }
        }
        assert_eq!(emitted, vec!["Tot ziens", "Nieuwe scene hier", "Tot ziens"]);

        // The repeat of an already narrated phrase is not spoken again
        assert_eq!(app.pending_utterances(), 2);
        assert_eq!(app.next_utterance().unwrap().text, "Tot ziens");
        assert_eq!(app.next_utterance().unwrap().text, "Nieuwe scene hier");
        assert!(app.next_utterance().is_none());
    }

    #[tokio::test]
    async fn test_quarter_frame_band_limits_text_zone() {
        let mut config = AppConfig::default();
        config.capture.quarter_frame = true;
        // Band of 480 / 3 = 160 rows; text bottom at 170 costs 10 points
        let script = vec![phrase(&["Hallo", "daar"], 150.0), None];
        let app = SubtitleReaderApp::new(config, ReplayRecognizer::new(script, "nl")).unwrap();
        app.start_session().unwrap();

        let frame = CapturedFrame::blank(640, 480);
        assert!(app.tick(&frame).await.is_empty());
        // Confidence 90 does not clear the threshold, nothing was tracked
        assert!(app.tick(&frame).await.is_empty());
        assert_eq!(app.pending_utterances(), 0);
    }

    #[tokio::test]
    async fn test_stop_session_clears_state() {
        let app = app(vec![
            phrase(&["Hallo", "daar"], 10.0),
            None,
            phrase(&["Hallo", "daar"], 10.0),
            None,
        ]);
        let frame = CapturedFrame::blank(640, 480);

        app.start_session().unwrap();
        app.tick(&frame).await;
        assert_eq!(app.tick(&frame).await.text, "Hallo daar");
        assert_eq!(app.pending_utterances(), 1);

        app.stop_session().unwrap();
        assert!(!app.is_session_active());
        assert_eq!(app.pending_utterances(), 0);

        // A new session may narrate the same phrase again
        app.start_session().unwrap();
        app.tick(&frame).await;
        app.tick(&frame).await;
        assert_eq!(app.next_utterance().unwrap().text, "Hallo daar");
    }
}
