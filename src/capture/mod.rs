//! Frame Capture Layer
//!
//! Camera capture itself is owned by the host application; this layer only
//! describes captured frames and how they are narrowed to the subtitle band
//! before recognition.

pub mod frame;

use serde::{Deserialize, Serialize};

pub use frame::CapturedFrame;

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Recognizer language tag
    pub language: String,
    /// Interval between recognition ticks in milliseconds
    pub poll_interval_ms: u64,
    /// Minimum confidence a phrase must exceed to be tracked
    pub confidence_threshold: i32,
    /// Restrict recognition to the top band of the frame
    pub quarter_frame: bool,
    /// The top band is the first `height / band_divisor` rows
    pub band_divisor: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            language: "nl".to_string(),
            poll_interval_ms: 600,
            confidence_threshold: 90,
            quarter_frame: false,
            band_divisor: 3,
        }
    }
}

/// Per-tick parameters handed to the phrase tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSettings {
    /// Confidence must be strictly greater than this to be tracked
    pub confidence_threshold: i32,
    /// Quarter-frame (subtitle band) mode is active
    pub quarter_frame: bool,
    /// Height of the subtitle band, also the bottom of the expected text zone
    pub quarter_frame_height: u32,
}

impl CaptureSettings {
    /// Prepare a frame for recognition and derive this tick's settings
    ///
    /// The band height is always reported as the top-zone height, even when
    /// the frame itself is not cropped.
    pub fn prepare(&self, frame: &CapturedFrame) -> (CapturedFrame, TickSettings) {
        let band_height = frame.band_height(self.band_divisor);
        let to_recognize = if self.quarter_frame {
            frame.top_band(self.band_divisor)
        } else {
            frame.clone()
        };

        let tick = TickSettings {
            confidence_threshold: self.confidence_threshold,
            quarter_frame: self.quarter_frame,
            quarter_frame_height: band_height,
        };

        (to_recognize, tick)
    }
}
