//! Frame data structures for captured camera content

use std::time::Instant;

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a new captured frame
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Create a frame with no pixel payload (for engines that ignore pixels)
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(Vec::new(), width, height)
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Height of the top subtitle band for the given divisor
    pub fn band_height(&self, band_divisor: u32) -> u32 {
        self.height / band_divisor.max(1)
    }

    /// Crop the frame to its top `height / band_divisor` rows
    pub fn top_band(&self, band_divisor: u32) -> CapturedFrame {
        let height = self.band_height(band_divisor);
        let row_bytes = (self.width * 4) as usize;
        let end = (row_bytes * height as usize).min(self.data.len());

        CapturedFrame {
            data: self.data[..end].to_vec(),
            width: self.width,
            height,
            timestamp: self.timestamp,
        }
    }
}
