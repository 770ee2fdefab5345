//! Phrase tracking state machine
//!
//! Keeps a rolling window of candidates believed to belong to the phrase
//! currently on screen and decides, once per tick, whether to extend the
//! window, start a new one, or emit the best candidate for narration.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::geometry::GeometryComparator;
use super::scorer::TextQualityScorer;
use super::similarity;
use super::Emission;
use crate::capture::TickSettings;
use crate::vision::{BoundingBox, RecognitionResult};

/// `previous_text` before anything was tracked
const NO_PREVIOUS_TEXT: &str = "0";

/// Tracker thresholds and penalties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Starting confidence of every frame
    pub base_confidence: i32,
    /// Window size that forces emission on the next tick
    pub forced_emission_after: usize,
    /// Raw text shorter than this is rejected
    pub min_raw_text_len: usize,
    /// Confidence reported when raw text is too short
    pub short_raw_text_confidence: i32,
    /// Penalty for exactly three detected lines
    pub three_lines_penalty: i32,
    /// Penalty for more than three detected lines
    pub many_lines_penalty: i32,
    /// Frames skewed more than this many degrees are rejected
    pub max_text_angle: f64,
    /// Quarter-frame mode: tallest word may be at most half the band minus this
    pub oversized_text_margin: f64,
    /// Penalty for oversized text in quarter-frame mode
    pub oversized_text_penalty: i32,
    /// Penalty for text reaching below the subtitle band
    pub outside_zone_penalty: i32,
    /// Corrected text this short (trimmed) is rejected
    pub min_text_len: usize,
    /// Edit distance below which texts are the same phrase
    pub max_edit_distance: usize,
    /// Bigram similarity above which texts are the same phrase
    pub strong_similarity: f64,
    /// Bigram similarity that suffices when geometry agrees
    pub weak_similarity: f64,
    /// Allowed shrink (chars) before a same-layout candidate is penalized
    pub shrink_tolerance: usize,
    /// Penalty for a same-layout candidate that shrank
    pub shrink_penalty: i32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_confidence: 100,
            forced_emission_after: 5,
            min_raw_text_len: 3,
            short_raw_text_confidence: 50,
            three_lines_penalty: 5,
            many_lines_penalty: 10,
            max_text_angle: 3.0,
            oversized_text_margin: 10.0,
            oversized_text_penalty: 15,
            outside_zone_penalty: 10,
            min_text_len: 4,
            max_edit_distance: 10,
            strong_similarity: 0.8,
            weak_similarity: 0.5,
            shrink_tolerance: 5,
            shrink_penalty: 5,
        }
    }
}

/// One scored recognition event
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 100 is best; may go negative
    pub confidence: i32,
    /// Normalized, corrected text
    pub text: String,
    /// Number of recognized words, at least 1
    pub word_count: usize,
    /// Union of all contributing word boxes
    pub bounding_box: BoundingBox,
}

/// Candidates believed to belong to the same on-screen phrase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedWindow {
    candidates: Vec<Candidate>,
    already_emitted: bool,
}

impl TrackedWindow {
    fn starting_with(candidate: Candidate) -> Self {
        Self {
            candidates: vec![candidate],
            already_emitted: false,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn already_emitted(&self) -> bool {
        self.already_emitted
    }

    pub fn last(&self) -> Option<&Candidate> {
        self.candidates.last()
    }

    /// Highest confidence candidate, earliest one on ties
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates
            .iter()
            .fold(None, |best: Option<&Candidate>, c| match best {
                Some(b) if b.confidence >= c.confidence => Some(b),
                _ => Some(c),
            })
    }

    fn push(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    /// Mark the window emitted and hand out its best candidate
    fn emit_best(&mut self) -> Option<Candidate> {
        let best = self.best().cloned();
        if best.is_some() {
            self.already_emitted = true;
        }
        best
    }
}

/// How a new candidate relates to the tracked window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// Similar text, or moderately similar text in a matching box
    SamePhrase,
    /// Dissimilar text, but a word box is identical to the previous frame
    SameLayout,
    /// A different phrase
    NewPhrase,
}

/// Logical state of the tracker
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TrackerState {
    /// Nothing tracked
    #[default]
    Idle,
    /// A phrase is being tracked
    Tracking {
        window: TrackedWindow,
        iterations: usize,
    },
    /// The window is large enough and not yet emitted; the next tick emits
    TimedOut {
        window: TrackedWindow,
        iterations: usize,
    },
}

impl TrackerState {
    /// Classify a window after it changed
    fn from_window(window: TrackedWindow, iterations: usize, forced_after: usize) -> Self {
        if window.is_empty() {
            TrackerState::Idle
        } else if iterations >= forced_after && !window.already_emitted() {
            TrackerState::TimedOut { window, iterations }
        } else {
            TrackerState::Tracking { window, iterations }
        }
    }

    fn into_parts(self) -> Option<(TrackedWindow, usize)> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Tracking { window, iterations }
            | TrackerState::TimedOut { window, iterations } => Some((window, iterations)),
        }
    }

    /// The tracked window, if any
    pub fn window(&self) -> Option<&TrackedWindow> {
        match self {
            TrackerState::Idle => None,
            TrackerState::Tracking { window, .. } | TrackerState::TimedOut { window, .. } => {
                Some(window)
            }
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            TrackerState::Idle => 0,
            TrackerState::Tracking { iterations, .. }
            | TrackerState::TimedOut { iterations, .. } => *iterations,
        }
    }

    /// Start of a tick: a timed-out window is emitted before anything else
    pub fn begin_tick(self, forced_after: usize) -> (TrackerState, Option<Candidate>) {
        match self {
            TrackerState::TimedOut {
                mut window,
                iterations,
            } => {
                let emitted = window.emit_best();
                (
                    TrackerState::from_window(window, iterations, forced_after),
                    emitted,
                )
            }
            other => (other, None),
        }
    }

    /// The recognizer produced nothing: flush the best candidate and go idle
    pub fn on_absent(self) -> (TrackerState, Option<Candidate>) {
        let best = self
            .into_parts()
            .and_then(|(window, _)| window.best().cloned());
        (TrackerState::Idle, best)
    }

    /// A frame with zero lines: repeat the last candidate to bridge the gap
    pub fn on_blank(self, forced_after: usize) -> TrackerState {
        match self.into_parts() {
            None => TrackerState::Idle,
            Some((mut window, iterations)) => {
                if let Some(last) = window.last().cloned() {
                    window.push(last);
                }
                TrackerState::from_window(window, iterations + 1, forced_after)
            }
        }
    }

    /// Merge an accepted candidate according to its continuity verdict
    pub fn on_candidate(
        self,
        candidate: Candidate,
        continuity: Continuity,
        forced_after: usize,
    ) -> (TrackerState, Option<Candidate>) {
        let Some((mut window, iterations)) = self.into_parts() else {
            return (
                TrackerState::from_window(TrackedWindow::starting_with(candidate), 1, forced_after),
                None,
            );
        };

        match continuity {
            Continuity::SamePhrase | Continuity::SameLayout => {
                window.push(candidate);
                (
                    TrackerState::from_window(window, iterations + 1, forced_after),
                    None,
                )
            }
            Continuity::NewPhrase => {
                let emitted = if window.already_emitted() {
                    None
                } else {
                    window.emit_best()
                };
                (
                    TrackerState::from_window(
                        TrackedWindow::starting_with(candidate),
                        1,
                        forced_after,
                    ),
                    emitted,
                )
            }
        }
    }
}

/// Turns per-frame recognition results into stable phrase emissions
#[derive(Debug, Clone)]
pub struct PhraseTracker {
    state: TrackerState,
    /// Text of the last candidate that cleared the threshold
    previous_text: String,
    /// Full recognizer output of that frame
    previous_result: Option<RecognitionResult>,
    scorer: TextQualityScorer,
    geometry: GeometryComparator,
    config: TrackerConfig,
}

impl Default for PhraseTracker {
    fn default() -> Self {
        Self::new(
            TrackerConfig::default(),
            TextQualityScorer::default(),
            GeometryComparator::default(),
        )
    }
}

impl PhraseTracker {
    pub fn new(
        config: TrackerConfig,
        scorer: TextQualityScorer,
        geometry: GeometryComparator,
    ) -> Self {
        Self {
            state: TrackerState::Idle,
            previous_text: NO_PREVIOUS_TEXT.to_string(),
            previous_result: None,
            scorer,
            geometry,
            config,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Number of candidates in the current window
    pub fn window_len(&self) -> usize {
        self.state.window().map_or(0, TrackedWindow::len)
    }

    pub fn previous_text(&self) -> &str {
        &self.previous_text
    }

    /// Forget the window and the previous-result memo
    pub fn reset(&mut self) {
        self.state = TrackerState::Idle;
        self.previous_text = NO_PREVIOUS_TEXT.to_string();
        self.previous_result = None;
        debug!("Tracker reset");
    }

    /// Process one tick's recognition result
    ///
    /// `None` is the engine-level null result. Returns the emission for this
    /// tick; rejected frames yield an empty text with the confidence reached.
    pub fn process(
        &mut self,
        result: Option<&RecognitionResult>,
        settings: &TickSettings,
    ) -> Emission {
        let forced_after = self.config.forced_emission_after;
        let (state, staged) = std::mem::take(&mut self.state).begin_tick(forced_after);
        self.state = state;
        if let Some(candidate) = &staged {
            info!(
                "Tracker: window timed out, emitting {:?} ({})",
                candidate.text, candidate.confidence
            );
        }

        let Some(result) = result else {
            let (state, best) = std::mem::take(&mut self.state).on_absent();
            self.state = state;
            debug!("Tracker: null recognizer result");
            return best.map(Emission::from).unwrap_or_default();
        };

        if result.lines.is_empty() {
            self.state = std::mem::take(&mut self.state).on_blank(forced_after);
            debug!(
                "Tracker: no lines, bridging with last candidate ({} iterations)",
                self.state.iterations()
            );
            return staged.map(Emission::from).unwrap_or_default();
        }

        match self.evaluate(result, settings) {
            Evaluation::Rejected(confidence) => Emission::rejected(confidence),
            Evaluation::BelowThreshold => staged.map(Emission::from).unwrap_or_default(),
            Evaluation::Accepted(candidate) => {
                let emitted = self.merge(candidate, result);
                staged.or(emitted).map(Emission::from).unwrap_or_default()
            }
        }
    }

    /// Frame-level checks and scoring
    fn evaluate(&self, result: &RecognitionResult, settings: &TickSettings) -> Evaluation {
        let cfg = &self.config;
        let word_count = result.word_count();
        let joined = result
            .words()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let Some(bounding_box) = result.union_box() else {
            return Evaluation::Rejected(cfg.short_raw_text_confidence);
        };
        if joined.chars().count() < cfg.min_raw_text_len {
            debug!("Tracker: raw text {:?} too short", joined);
            return Evaluation::Rejected(cfg.short_raw_text_confidence);
        }

        let mut confidence = cfg.base_confidence;
        match result.lines.len() {
            0..=2 => {}
            3 => confidence -= cfg.three_lines_penalty,
            _ => confidence -= cfg.many_lines_penalty,
        }

        if let Some(angle) = result.text_angle {
            if angle.abs() > cfg.max_text_angle {
                debug!("Tracker: text angle {:.1} too skewed, skipping frame", angle);
                return Evaluation::Rejected(confidence);
            }
        }

        // Word separator kept after the last word so trailing patterns match
        let scored = self.scorer.score(&format!("{} ", joined), confidence, word_count);
        let mut confidence = scored.confidence;
        debug!("Tracker: scored {:?} at {}", scored.text, confidence);

        let band_height = settings.quarter_frame_height as f64;
        if settings.quarter_frame {
            let max_height = (settings.quarter_frame_height / 2) as f64 - cfg.oversized_text_margin;
            let tallest = result.tallest_word_height();
            if tallest > max_height {
                confidence -= cfg.oversized_text_penalty;
                debug!(
                    "Tracker: tallest word {} exceeds {}, confidence {}",
                    tallest, max_height, confidence
                );
            }
        }

        if bounding_box.bottom() > band_height {
            confidence -= cfg.outside_zone_penalty;
            debug!(
                "Tracker: text bottom {} below band {}, confidence {}",
                bounding_box.bottom(),
                band_height,
                confidence
            );
        }

        let text = scored.text.trim();
        if text.chars().count() <= cfg.min_text_len {
            debug!("Tracker: corrected text {:?} too short", text);
            return Evaluation::Rejected(confidence);
        }

        if confidence <= settings.confidence_threshold {
            debug!(
                "Tracker: confidence {} not above threshold {}",
                confidence, settings.confidence_threshold
            );
            return Evaluation::BelowThreshold;
        }

        Evaluation::Accepted(Candidate {
            confidence,
            text: text.to_string(),
            word_count,
            bounding_box,
        })
    }

    /// Decide continuity, fold the candidate into the window, update the memo
    fn merge(&mut self, mut candidate: Candidate, result: &RecognitionResult) -> Option<Candidate> {
        let continuity = match self.state.window().and_then(TrackedWindow::last) {
            None => Continuity::SamePhrase,
            Some(last) => self.continuity(&candidate, last, result),
        };

        if continuity == Continuity::SameLayout {
            let previous_len = self.previous_text.chars().count();
            let new_len = candidate.text.chars().count();
            if previous_len > new_len + self.config.shrink_tolerance {
                candidate.confidence -= self.config.shrink_penalty;
                debug!(
                    "Tracker: text shrank from {} to {} chars, confidence {}",
                    previous_len, new_len, candidate.confidence
                );
            }
        }

        let text = candidate.text.clone();
        let (state, emitted) = std::mem::take(&mut self.state).on_candidate(
            candidate,
            continuity,
            self.config.forced_emission_after,
        );
        self.state = state;

        info!(
            "Tracker: {:?} -> {:?}, window {}",
            text,
            continuity,
            self.window_len()
        );
        if let Some(emitted) = &emitted {
            info!(
                "Tracker: new phrase, emitting {:?} ({})",
                emitted.text, emitted.confidence
            );
        }

        self.previous_text = text;
        self.previous_result = Some(result.clone());

        emitted
    }

    fn continuity(
        &self,
        candidate: &Candidate,
        last: &Candidate,
        result: &RecognitionResult,
    ) -> Continuity {
        let cfg = &self.config;
        let distance = similarity::edit_distance(&candidate.text, &self.previous_text);
        let similarity = similarity::bigram_similarity(&candidate.text, &self.previous_text);
        let box_similar = self
            .geometry
            .boxes_similar(&candidate.bounding_box, &last.bounding_box);
        let edges_aligned = self
            .geometry
            .edges_aligned(&candidate.bounding_box, &last.bounding_box);
        debug!(
            "Tracker: distance {} similarity {:.2} box {} edges {}",
            distance, similarity, box_similar, edges_aligned
        );

        if distance < cfg.max_edit_distance
            || similarity > cfg.strong_similarity
            || ((box_similar || edges_aligned) && similarity > cfg.weak_similarity)
        {
            Continuity::SamePhrase
        } else if self
            .previous_result
            .as_ref()
            .is_some_and(|previous| result.shares_word_box_with(previous))
        {
            Continuity::SameLayout
        } else {
            Continuity::NewPhrase
        }
    }
}

/// Outcome of the frame-level checks
enum Evaluation {
    /// Frame discarded; carries the confidence reached
    Rejected(i32),
    /// Valid frame that did not clear the threshold
    BelowThreshold,
    /// Candidate ready to merge
    Accepted(Candidate),
}
