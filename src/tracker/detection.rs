//! Per-frame detection values fed to the tracker.

use ndarray::Array1;

use crate::tracker::identity::TrackId;
use crate::tracker::rect::Rect;

/// Opaque appearance feature vector (typically a flattened color histogram).
pub type Histogram = Array1<f32>;

/// One candidate bounding box in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// 1-based frame number
    pub frame: u32,
    /// Identity, set by the tracker
    pub id: TrackId,
    /// Box geometry (TLWH)
    pub rect: Rect,
    /// Detector confidence in [0, 1]
    pub confidence: Option<f32>,
    pub class_id: Option<i32>,
    pub visibility: Option<f32>,
}

impl Detection {
    /// Create an unassigned detection. Negative left/top and width/height are
    /// clamped to zero.
    pub fn new(frame: u32, left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            frame,
            id: TrackId::Unassigned,
            rect: Rect::new(left.max(0.0), top.max(0.0), width.max(0.0), height.max(0.0)),
            confidence: None,
            class_id: None,
            visibility: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_id(mut self, id: TrackId) -> Self {
        self.id = id;
        self
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn area(&self) -> f32 {
        self.rect.area()
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        self.rect.iou(&other.rect)
    }
}

impl AsRef<Detection> for Detection {
    fn as_ref(&self) -> &Detection {
        self
    }
}

/// A detection together with its appearance histogram.
#[derive(Debug, Clone)]
pub struct Observation {
    pub detection: Detection,
    pub histogram: Histogram,
}

impl Observation {
    pub fn new(detection: Detection, histogram: Histogram) -> Self {
        Self {
            detection,
            histogram,
        }
    }
}

impl AsRef<Detection> for Observation {
    fn as_ref(&self) -> &Detection {
        &self.detection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_origin() {
        let det = Detection::new(3, -5.0, -1.0, 20.0, 10.0);
        assert_eq!(det.rect.x, 0.0);
        assert_eq!(det.rect.y, 0.0);
        assert_eq!(det.rect.right(), 20.0);
        assert_eq!(det.id, TrackId::Unassigned);
    }

    #[test]
    fn test_new_clamps_negative_size() {
        let det = Detection::new(1, 10.0, 10.0, -4.0, 6.0);
        assert_eq!(det.rect.width, 0.0);
        assert_eq!(det.area(), 0.0);
    }
}
