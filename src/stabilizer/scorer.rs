//! Text quality scoring
//!
//! Applies pattern-based penalties for typical recognizer misreads to the raw
//! text of one frame, then runs a literal correction table. Confidence is
//! never clamped; only the relative ordering between candidates matters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use super::similarity;

/// Punctuation run glued to a word, e.g. `wo.rd` or `!ja`
static STRAY_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;:.?)(/!,*—_]+\w+").expect("stray punctuation pattern is valid"));

/// Capitals, digits or dashes following a word character, e.g. `wOrD4`
static CAPITAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w[A-Z0-9-]+").expect("capital run pattern is valid"));

/// A lone alphanumeric surrounded by spaces
static SINGLE_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [a-zA-Z0-9-] ").expect("single char pattern is valid"));

/// Where a correction pattern has to occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAnchor {
    /// Replace every occurrence
    #[default]
    Anywhere,
    /// Replace only when the text starts with the pattern
    Prefix,
}

/// One literal correction for a known recognizer failure mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRule {
    /// Exact, case-sensitive text to look for
    pub pattern: String,
    /// Replacement text
    pub replacement: String,
    /// Match position
    #[serde(default)]
    pub anchor: MatchAnchor,
    /// Confidence subtracted once when the rule fires
    #[serde(default)]
    pub penalty: i32,
}

impl CorrectionRule {
    pub fn anywhere(pattern: &str, replacement: &str, penalty: i32) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            anchor: MatchAnchor::Anywhere,
            penalty,
        }
    }

    pub fn prefix(pattern: &str, replacement: &str, penalty: i32) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            anchor: MatchAnchor::Prefix,
            penalty,
        }
    }

    /// Apply the rule, returning the penalty if it fired
    fn apply(&self, text: &mut String) -> Option<i32> {
        if self.pattern.is_empty() {
            return None;
        }

        match self.anchor {
            MatchAnchor::Prefix => {
                let rest = text.strip_prefix(self.pattern.as_str())?;
                *text = format!("{}{}", self.replacement, rest);
            }
            MatchAnchor::Anywhere => {
                if !text.contains(self.pattern.as_str()) {
                    return None;
                }
                *text = text.replace(self.pattern.as_str(), &self.replacement);
            }
        }

        Some(self.penalty)
    }
}

/// Corrections for Dutch subtitles, applied in order
pub fn dutch_corrections() -> Vec<CorrectionRule> {
    vec![
        // "Ik" read as "lk"
        CorrectionRule::prefix("lk ", "ik ", 1),
        CorrectionRule::anywhere("0f", "of", 0),
        CorrectionRule::anywhere(" lk ", " Ik ", 0),
        CorrectionRule::anywhere("'lk ", " Ik ", 0),
        // Spoken form of the honorific
        CorrectionRule::anywhere(" Mr ", " Meneer ", 0),
        CorrectionRule::anywhere("Mr. ", " Meneer ", 0),
        CorrectionRule::anywhere("Mr ", " Meneer ", 0),
        CorrectionRule::prefix("'Mr ", "Meneer ", 1),
        CorrectionRule::anywhere("_", "", 0),
        CorrectionRule::anywhere(" nlet ", " niet ", 1),
    ]
}

/// Scorer weights and the correction table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Per-clean-word penalty when stray punctuation is found
    pub stray_punctuation_weight: i32,
    /// Flat penalty for stray punctuation in short or fully broken text
    pub stray_punctuation_flat: i32,
    /// Texts shorter than this get an extra penalty when noise was removed
    pub short_text_len: usize,
    /// Extra penalty for short texts that needed noise removal
    pub short_text_penalty: i32,
    /// Per-match penalty for capital/digit runs inside words
    pub capital_run_weight: i32,
    /// Flat penalty for capital/digit runs in short or fully broken text
    pub capital_run_flat: i32,
    /// Per-occurrence penalty for stray single characters
    pub single_char_weight: i32,
    /// Extra penalty when several misread signals co-occur
    pub compound_penalty: i32,
    /// Literal corrections, applied in order
    pub corrections: Vec<CorrectionRule>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            stray_punctuation_weight: 3,
            stray_punctuation_flat: 20,
            short_text_len: 15,
            short_text_penalty: 5,
            capital_run_weight: 5,
            capital_run_flat: 10,
            single_char_weight: 5,
            compound_penalty: 10,
            corrections: dutch_corrections(),
        }
    }
}

/// Corrected text with its adjusted confidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredText {
    pub text: String,
    pub confidence: i32,
}

/// Scores and corrects the raw text of one frame
#[derive(Debug, Clone, Default)]
pub struct TextQualityScorer {
    config: ScorerConfig,
}

impl TextQualityScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Run the penalty pipeline and the correction table
    pub fn score(&self, raw: &str, confidence: i32, word_count: usize) -> ScoredText {
        let cfg = &self.config;
        let words = word_count as i32;
        let mut confidence = confidence;

        let stray = STRAY_PUNCTUATION.find_iter(raw).count() as i32;
        if stray > 0 {
            if words > 1 && words > stray {
                confidence -= (words - stray) * cfg.stray_punctuation_weight;
            } else {
                confidence -= cfg.stray_punctuation_flat;
            }
            debug!("Scorer: {} stray punctuation runs, confidence {}", stray, confidence);
        }

        let mut text = similarity::strip_noise(raw);
        let removed =
            raw.trim_end().chars().count() as i32 - text.trim_end().chars().count() as i32;
        confidence -= removed;
        if text.chars().count() < cfg.short_text_len && removed > 1 {
            confidence -= cfg.short_text_penalty;
        }
        if removed != 0 {
            debug!("Scorer: removed {} noise chars, confidence {}", removed, confidence);
        }

        let accented = similarity::count_accented(&text) as i32;
        if accented > 0 {
            text = similarity::strip_accents(&text);
            confidence -= accented;
            debug!("Scorer: {} accented chars, confidence {}", accented, confidence);
        }

        let capitals = CAPITAL_RUN.find_iter(&text).count() as i32;
        if capitals > 0 {
            if words > 1 && words > capitals {
                confidence -= capitals * cfg.capital_run_weight;
            } else {
                confidence -= cfg.capital_run_flat;
            }
            debug!("Scorer: {} capital runs, confidence {}", capitals, confidence);
        }

        let singles = SINGLE_CHAR.find_iter(&text).count() as i32;
        if singles > 0 {
            confidence -= singles * cfg.single_char_weight;
            debug!("Scorer: {} stray single chars, confidence {}", singles, confidence);
        }

        let co_occurring = [stray, singles, capitals].iter().filter(|&&n| n > 0).count();
        if co_occurring >= 2 || (accented > 0 && (removed > 0 || singles > 0)) {
            confidence -= cfg.compound_penalty;
            debug!("Scorer: compound misread signals, confidence {}", confidence);
        }

        for rule in &cfg.corrections {
            if let Some(penalty) = rule.apply(&mut text) {
                confidence -= penalty;
                debug!("Scorer: corrected {:?} -> {:?}", rule.pattern, rule.replacement);
            }
        }

        ScoredText { text, confidence }
    }
}
