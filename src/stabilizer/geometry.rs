//! Bounding box comparisons between consecutive recognitions

use serde::{Deserialize, Serialize};

use crate::vision::BoundingBox;

/// Compares phrase bounding boxes for near-equality and shared edges
///
/// Height is the tighter signal: the line count of a subtitle rarely changes
/// between frames, while width jitters with occlusion and antialiasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryComparator {
    /// Maximum height difference (exclusive)
    pub height_tolerance: f64,
    /// Maximum width difference (exclusive)
    pub width_tolerance: f64,
    /// Maximum left or right edge offset (exclusive)
    pub edge_tolerance: f64,
}

impl Default for GeometryComparator {
    fn default() -> Self {
        Self {
            height_tolerance: 2.0,
            width_tolerance: 5.0,
            edge_tolerance: 3.0,
        }
    }
}

impl GeometryComparator {
    /// Same size within tolerance, regardless of position
    pub fn boxes_similar(&self, a: &BoundingBox, b: &BoundingBox) -> bool {
        (a.height - b.height).abs() < self.height_tolerance
            && (a.width - b.width).abs() < self.width_tolerance
    }

    /// Left edges or right edges line up (left- or right-justified subtitles)
    pub fn edges_aligned(&self, a: &BoundingBox, b: &BoundingBox) -> bool {
        (a.left - b.left).abs() < self.edge_tolerance
            || (a.right() - b.right()).abs() < self.edge_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(left: f64, top: f64, width: f64, height: f64) -> BoundingBox {
        BoundingBox::new(left, top, width, height)
    }

    #[test]
    fn test_boxes_similar_thresholds() {
        let geometry = GeometryComparator::default();
        let base = rect(10.0, 10.0, 100.0, 20.0);

        assert!(geometry.boxes_similar(&base, &rect(300.0, 90.0, 104.0, 21.0)));
        assert!(!geometry.boxes_similar(&base, &rect(10.0, 10.0, 105.0, 20.0)));
        assert!(!geometry.boxes_similar(&base, &rect(10.0, 10.0, 100.0, 22.0)));
        assert!(geometry.boxes_similar(&rect(0.0, 0.0, 96.0, 18.5), &base));
    }

    #[test]
    fn test_edges_aligned_either_side() {
        let geometry = GeometryComparator::default();
        let base = rect(10.0, 10.0, 100.0, 20.0);

        // Left-justified, different width
        assert!(geometry.edges_aligned(&base, &rect(12.0, 50.0, 40.0, 20.0)));
        // Right-justified: right edges 110 and 111
        assert!(geometry.edges_aligned(&base, &rect(71.0, 50.0, 40.0, 20.0)));
        // Neither edge within 3px
        assert!(!geometry.edges_aligned(&base, &rect(13.0, 10.0, 103.0, 20.0)));
    }

    #[test]
    fn test_comparisons_are_symmetric() {
        let geometry = GeometryComparator::default();
        let a = rect(10.0, 10.0, 100.0, 20.0);
        let b = rect(11.0, 40.0, 97.0, 21.0);

        assert_eq!(geometry.boxes_similar(&a, &b), geometry.boxes_similar(&b, &a));
        assert_eq!(geometry.edges_aligned(&a, &b), geometry.edges_aligned(&b, &a));
    }
}
