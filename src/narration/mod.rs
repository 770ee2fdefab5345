//! Narration Queue
//!
//! Collects emitted phrases for speech. Phrases already spoken in the current
//! session are skipped, and the speaking rate goes up while a backlog builds.
//! Speech synthesis itself is left to the consumer of [`Utterance`]s.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::stabilizer::Emission;

/// Speaking-rate and de-duplication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Normal speaking rate
    pub base_rate: f64,
    /// Rate increase per backlogged dequeue
    pub rate_step: f64,
    /// The rate only goes up while below this value
    pub max_rate: f64,
    /// More than this many pending utterances counts as a backlog
    pub backlog_threshold: usize,
    /// Number of recently queued phrases remembered for de-duplication
    pub history_len: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            base_rate: 1.2,
            rate_step: 0.2,
            max_rate: 1.7,
            backlog_threshold: 2,
            history_len: 20,
        }
    }
}

/// A phrase ready to be spoken
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub confidence: i32,
    /// Speaking rate multiplier
    pub rate: f64,
}

/// Pending phrases plus the session's spoken history
pub struct NarrationQueue {
    config: NarrationConfig,
    incoming: Receiver<Emission>,
    pending: VecDeque<Emission>,
    history: VecDeque<String>,
    rate: f64,
}

impl NarrationQueue {
    /// Create a queue and the sender that feeds it
    pub fn new(config: NarrationConfig) -> (Sender<Emission>, Self) {
        let (tx, incoming) = unbounded();
        let rate = config.base_rate;
        let queue = Self {
            config,
            incoming,
            pending: VecDeque::new(),
            history: VecDeque::new(),
            rate,
        };
        (tx, queue)
    }

    /// Current speaking rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Number of phrases waiting to be spoken
    pub fn pending_len(&mut self) -> usize {
        self.drain_incoming();
        self.pending.len()
    }

    /// Take the next phrase to speak, adapting the rate to the backlog
    pub fn next_utterance(&mut self) -> Option<Utterance> {
        self.drain_incoming();

        let pending = self.pending.len();
        if pending > 1 {
            if self.rate < self.config.max_rate && pending > self.config.backlog_threshold {
                self.rate += self.config.rate_step;
                debug!("Narration backlog of {}, rate up to {:.1}", pending, self.rate);
            } else {
                self.rate = self.config.base_rate;
            }
        }

        let emission = self.pending.pop_front()?;
        Some(Utterance {
            text: emission.text,
            confidence: emission.confidence,
            rate: self.rate,
        })
    }

    /// Drop everything pending and forget the spoken history
    pub fn reset(&mut self) {
        let discarded = self.incoming.try_iter().count() + self.pending.len();
        self.pending.clear();
        self.history.clear();
        self.rate = self.config.base_rate;
        info!("Narration reset, {} pending phrases discarded", discarded);
    }

    fn drain_incoming(&mut self) {
        while let Ok(emission) = self.incoming.try_recv() {
            self.enqueue(emission);
        }
    }

    /// Queue a phrase unless it is empty or was already queued this session
    fn enqueue(&mut self, emission: Emission) -> bool {
        let text = emission.text.trim();
        if text.is_empty() {
            return false;
        }
        if self.history.iter().any(|spoken| spoken == text) {
            debug!("Narration: skipping repeated phrase {:?}", text);
            return false;
        }

        if self.history.len() == self.config.history_len.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(text.to_string());
        self.pending.push_back(emission);
        true
    }
}
