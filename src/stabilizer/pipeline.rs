//! Recognition pipeline
//!
//! Runs one recognition per tick and feeds the result to the phrase tracker.
//! Recognition may take longer than the polling interval, so overlapping
//! ticks are dropped rather than queued.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::tracker::PhraseTracker;
use super::{Emission, PipelineError};
use crate::capture::frame::CapturedFrame;
use crate::capture::TickSettings;
use crate::vision::Recognizer;

/// Clears the busy flag on every exit path
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Recognizer plus phrase tracker, with a drop-not-queue tick guard
pub struct OcrPipeline<R: Recognizer> {
    recognizer: R,
    tracker: Mutex<PhraseTracker>,
    busy: AtomicBool,
}

impl<R: Recognizer> OcrPipeline<R> {
    /// Create a pipeline, failing if the recognizer cannot handle `language`
    pub fn new(recognizer: R, language: &str, tracker: PhraseTracker) -> Result<Self, PipelineError> {
        if !recognizer.supports_language(language) {
            return Err(PipelineError::UnsupportedLanguage(language.to_string()));
        }

        info!("OCR pipeline ready for language {:?}", language);
        Ok(Self {
            recognizer,
            tracker: Mutex::new(tracker),
            busy: AtomicBool::new(false),
        })
    }

    /// Recognize one frame and run it through the tracker
    ///
    /// Returns an empty emission immediately, without touching any state,
    /// when the previous tick is still recognizing.
    pub async fn process_frame(&self, frame: &CapturedFrame, settings: &TickSettings) -> Emission {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Recognition still in flight, dropping tick");
            return Emission::none();
        };

        let result = match self.recognizer.recognize(frame).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Recognizer failed, skipping tick: {}", e);
                return Emission::none();
            }
        };

        self.tracker.lock().process(result.as_ref(), settings)
    }

    /// Clear the tracked window and previous-result memo
    pub fn reset(&self) -> Result<(), PipelineError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return Err(PipelineError::Busy);
        };
        self.tracker.lock().reset();
        Ok(())
    }

    /// Whether a recognition is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Number of candidates in the tracked window
    pub fn window_len(&self) -> usize {
        self.tracker.lock().window_len()
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }
}
