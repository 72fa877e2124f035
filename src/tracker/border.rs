//! Optional heuristic that marks oversized, freshly appearing boxes away from
//! the frame border for deletion.
//!
//! Objects normally enter the scene across the frame border. A large box that
//! shows up in the middle of the frame without a track on the previous frame
//! is usually a spurious detection.

use serde::{Deserialize, Serialize};

use crate::tracker::detection::Detection;
use crate::tracker::history::TrackHistory;
use crate::tracker::rect::Rect;
use crate::tracker::similarity::FrameShape;

/// When the heuristic runs relative to assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStage {
    /// Flagged detections never take part in matching.
    BeforeMatching,
    /// Flagged detections lose the identity they were assigned.
    #[default]
    AfterMatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub stage: BorderStage,
    /// Distance in pixels from the frame edge that still counts as "at the border"
    pub margin: f32,
    /// A box is oversized when its area exceeds the frame's mean box area times this
    pub area_multiplier: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            stage: BorderStage::AfterMatching,
            margin: 10.0,
            area_multiplier: 2.0,
        }
    }
}

impl BorderConfig {
    pub fn near_border(&self, rect: &Rect, frame: FrameShape) -> bool {
        rect.x <= self.margin
            || rect.y <= self.margin
            || rect.right() >= frame.width as f32 - self.margin
            || rect.bottom() >= frame.height as f32 - self.margin
    }

    /// Indices of the detections in `frame` that should be deleted.
    ///
    /// `has_continuity` decides whether a detection is backed by a track seen
    /// on the previous frame.
    pub fn flag<F>(
        &self,
        detections: &[&Detection],
        frame: FrameShape,
        has_continuity: F,
    ) -> Vec<usize>
    where
        F: Fn(usize, &Detection) -> bool,
    {
        if detections.is_empty() {
            return Vec::new();
        }
        let mean_area =
            detections.iter().map(|d| d.area()).sum::<f32>() / detections.len() as f32;
        let limit = mean_area * self.area_multiplier;

        detections
            .iter()
            .enumerate()
            .filter(|&(i, d)| {
                d.area() > limit && !self.near_border(&d.rect, frame) && !has_continuity(i, *d)
            })
            .map(|(i, _)| i)
            .collect()
    }
}

/// Continuity test used before matching: some track seen on the previous
/// frame overlaps the detection.
pub fn overlaps_previous_frame(history: &TrackHistory, detection: &Detection) -> bool {
    let previous = detection.frame.saturating_sub(1);
    history
        .iter()
        .any(|(_, e)| e.last_seen() == previous && e.latest.iou(detection) > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const FRAME: FrameShape = FrameShape {
        height: 480,
        width: 640,
    };

    fn det(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(2, x, y, w, h)
    }

    #[test]
    fn test_near_border() {
        let config = BorderConfig::default();
        assert!(config.near_border(&Rect::new(5.0, 100.0, 20.0, 20.0), FRAME));
        assert!(config.near_border(&Rect::new(100.0, 100.0, 535.0, 20.0), FRAME));
        assert!(!config.near_border(&Rect::new(100.0, 100.0, 20.0, 20.0), FRAME));
    }

    #[test]
    fn test_flags_large_central_box() {
        let config = BorderConfig::default();
        let small_a = det(100.0, 100.0, 10.0, 10.0);
        let small_b = det(300.0, 100.0, 10.0, 10.0);
        let big = det(200.0, 200.0, 100.0, 100.0);
        let frame = [&small_a, &small_b, &big];

        assert_eq!(config.flag(&frame, FRAME, |_, _| false), vec![2]);
        assert!(config.flag(&frame, FRAME, |_, _| true).is_empty());
    }

    #[test]
    fn test_large_box_at_border_is_kept() {
        let config = BorderConfig {
            area_multiplier: 1.5,
            ..BorderConfig::default()
        };
        let small = det(100.0, 100.0, 10.0, 10.0);
        let big = det(0.0, 200.0, 100.0, 100.0);
        assert!(config.flag(&[&small, &big], FRAME, |_, _| false).is_empty());
    }

    #[test]
    fn test_overlaps_previous_frame() {
        let mut history = TrackHistory::new(2);
        history.update(1, Detection::new(1, 200.0, 200.0, 100.0, 100.0), array![1.0]);
        history.update(2, Detection::new(0, 400.0, 400.0, 10.0, 10.0), array![1.0]);

        assert!(overlaps_previous_frame(&history, &det(210.0, 210.0, 100.0, 100.0)));
        assert!(!overlaps_previous_frame(&history, &det(400.0, 400.0, 10.0, 10.0)));
    }
}
