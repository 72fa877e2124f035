//! Fluent construction of detections and observations from common box layouts.

use crate::tracker::{Detection, Histogram, Observation, TrackId};

/// Builds a [`Detection`] (and optionally its [`Observation`]) one field at a time.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    frame: u32,
    id: TrackId,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: Option<f32>,
    class_id: Option<i32>,
    visibility: Option<f32>,
}

impl Default for DetectionBuilder {
    fn default() -> Self {
        Self {
            frame: 1,
            id: TrackId::Unassigned,
            x1: 0.0,
            y1: 0.0,
            x2: 0.0,
            y2: 0.0,
            confidence: None,
            class_id: None,
            visibility: None,
        }
    }
}

impl DetectionBuilder {
    /// Create a new detection builder for frame 1.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, frame: u32) -> Self {
        self.frame = frame;
        self
    }

    pub fn id(mut self, id: TrackId) -> Self {
        self.id = id;
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn class_id(mut self, class_id: i32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let mut det = Detection::new(
            self.frame,
            self.x1,
            self.y1,
            self.x2 - self.x1,
            self.y2 - self.y1,
        )
        .with_id(self.id);
        det.confidence = self.confidence;
        det.class_id = self.class_id;
        det.visibility = self.visibility;
        det
    }

    /// Build the detection and pair it with its appearance histogram.
    pub fn observe(self, histogram: Histogram) -> Observation {
        Observation::new(self.build(), histogram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new()
            .frame(4)
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .confidence(0.95)
            .build();

        assert_eq!(det.frame, 4);
        assert_eq!(det.confidence, Some(0.95));
        assert_eq!(det.rect.to_tlwh(), [10.0, 20.0, 40.0, 60.0]);
        assert_eq!(det.id, TrackId::Unassigned);
    }

    #[test]
    fn test_xywh_and_tlwh_agree() {
        let a = DetectionBuilder::new().xywh(25.0, 40.0, 30.0, 40.0).build();
        let b = DetectionBuilder::new().tlwh(10.0, 20.0, 30.0, 40.0).build();
        assert_eq!(a.rect, b.rect);
    }

    #[test]
    fn test_observe_keeps_histogram() {
        let obs = DetectionBuilder::new()
            .tlwh(0.0, 0.0, 5.0, 5.0)
            .class_id(1)
            .visibility(0.5)
            .observe(array![0.25, 0.75]);
        assert_eq!(obs.histogram.len(), 2);
        assert_eq!(obs.detection.class_id, Some(1));
        assert_eq!(obs.detection.visibility, Some(0.5));
    }
}
