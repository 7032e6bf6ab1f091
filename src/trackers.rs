use crate::utils::bbox::BoundingBox;

/// Per-camera two-stage (ByteTrack) association engine
///
pub mod byte;

/// Multi-camera orchestration, zone transitions and observers
///
pub mod manager;

/// Frame batch plumbing for concurrent multi-camera updates
///
pub mod batch;

/// Detections scored below this floor never participate in matching
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.1;

/// Detector output for a single object on a single frame
///
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    /// absolute pixel coordinates, `x2 > x1`, `y2 > y1`
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: i64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: i64) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }

    /// Detections failing this check are dropped before any processing
    ///
    pub fn is_valid(&self) -> bool {
        self.bbox.is_valid()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use crate::trackers::Detection;
    use crate::utils::bbox::BoundingBox;

    #[test]
    fn validity() {
        let good = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 0);
        assert!(good.is_valid());

        let degenerate = Detection::new(BoundingBox::new(10.0, 0.0, 0.0, 10.0), 0.9, 0);
        assert!(!degenerate.is_valid());

        let nan = Detection::new(BoundingBox::new(0.0, f32::NAN, 10.0, 10.0), 0.9, 0);
        assert!(!nan.is_valid());

        let out_of_range = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1.5, 0);
        assert!(!out_of_range.is_valid());
    }
}
