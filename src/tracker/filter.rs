//! Per-frame detection clean-up: confidence thresholding, IoU duplicate
//! suppression and containment suppression.
//!
//! Every stage keeps the input order of the survivors. Suppression ties are
//! always resolved in favour of the box seen first; callers that want
//! confidence-ordered NMS must sort each frame by confidence beforehand.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::tracker::detection::Detection;
use crate::tracker::rect::{Rect, iou_batch};

/// What the confidence filter does with detections that carry no confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingConfidence {
    Keep,
    #[default]
    Drop,
}

/// Configuration of the filter stages applied to every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Keep detections with `confidence > threshold`; `None` disables the stage.
    pub confidence_threshold: Option<f32>,
    pub missing_confidence: MissingConfidence,
    /// Drop the later box of any pair with `IoU > threshold`; `None` disables the stage.
    pub iou_threshold: Option<f32>,
    /// Drop boxes that fully contain a smaller box.
    pub suppress_containing: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: Some(0.5),
            missing_confidence: MissingConfidence::Drop,
            iou_threshold: Some(0.7),
            suppress_containing: true,
        }
    }
}

impl FilterConfig {
    /// A configuration that lets every detection through.
    pub fn passthrough() -> Self {
        Self {
            confidence_threshold: None,
            missing_confidence: MissingConfidence::Keep,
            iou_threshold: None,
            suppress_containing: false,
        }
    }

    /// Run all enabled stages on one frame, in order confidence, IoU, containment.
    pub fn apply<T: AsRef<Detection>>(&self, mut frame: Vec<T>) -> Vec<T> {
        if let Some(threshold) = self.confidence_threshold {
            frame = retain_confident(threshold, self.missing_confidence, frame);
        }
        if let Some(threshold) = self.iou_threshold {
            frame = suppress_overlaps(threshold, frame);
        }
        if self.suppress_containing {
            frame = suppress_containing(frame);
        }
        frame
    }
}

/// Keep the detections of one frame whose confidence is strictly above `threshold`.
pub fn retain_confident<T: AsRef<Detection>>(
    threshold: f32,
    missing: MissingConfidence,
    frame: Vec<T>,
) -> Vec<T> {
    frame
        .into_iter()
        .filter(|d| match d.as_ref().confidence {
            Some(conf) => conf > threshold,
            None => missing == MissingConfidence::Keep,
        })
        .collect()
}

/// Remove, for every pair with `IoU > threshold`, the box seen second.
///
/// A removed box is not compared again, so a box can only be suppressed by a
/// box that survives.
pub fn suppress_overlaps<T: AsRef<Detection>>(threshold: f32, frame: Vec<T>) -> Vec<T> {
    let rects: Vec<Rect> = frame.iter().map(|d| d.as_ref().rect).collect();
    let ious = iou_batch(&rects, &rects);

    let mut removed = vec![false; rects.len()];
    for i in 0..rects.len() {
        if removed[i] {
            continue;
        }
        for j in (i + 1)..rects.len() {
            if !removed[j] && ious[[i, j]] > threshold {
                trace!(kept = i, removed = j, iou = ious[[i, j]], "iou suppression");
                removed[j] = true;
            }
        }
    }

    keep_unremoved(frame, &removed)
}

/// Remove every box that fully contains another, smaller box.
///
/// Identical boxes contain each other; the one seen second is removed.
pub fn suppress_containing<T: AsRef<Detection>>(frame: Vec<T>) -> Vec<T> {
    let rects: Vec<Rect> = frame.iter().map(|d| d.as_ref().rect).collect();

    let mut removed = vec![false; rects.len()];
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if removed[i] {
                break;
            }
            if removed[j] {
                continue;
            }
            let (a, b) = (&rects[i], &rects[j]);
            if a.contains(b) && a.area() > b.area() {
                removed[i] = true;
            } else if b.contains(a) {
                removed[j] = true;
            }
        }
    }

    keep_unremoved(frame, &removed)
}

fn keep_unremoved<T>(frame: Vec<T>, removed: &[bool]) -> Vec<T> {
    frame
        .into_iter()
        .zip(removed)
        .filter_map(|(d, &gone)| if gone { None } else { Some(d) })
        .collect()
}

/// Apply [`retain_confident`] to every frame of a video.
pub fn confidence_filter<T: AsRef<Detection>>(
    threshold: f32,
    missing: MissingConfidence,
    frames: Vec<Vec<T>>,
) -> Vec<Vec<T>> {
    frames
        .into_iter()
        .map(|frame| retain_confident(threshold, missing, frame))
        .collect()
}

/// Apply [`suppress_overlaps`] to every frame of a video.
pub fn iou_filter<T: AsRef<Detection>>(threshold: f32, frames: Vec<Vec<T>>) -> Vec<Vec<T>> {
    frames
        .into_iter()
        .map(|frame| suppress_overlaps(threshold, frame))
        .collect()
}

/// Apply [`suppress_containing`] to every frame of a video.
pub fn overlap_filter<T: AsRef<Detection>>(frames: Vec<Vec<T>>) -> Vec<Vec<T>> {
    frames.into_iter().map(suppress_containing).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn det(left: f32, top: f32, w: f32, h: f32, conf: f32) -> Detection {
        Detection::new(1, left, top, w, h).with_confidence(conf)
    }

    #[test]
    fn test_confidence_is_strict() {
        let frame = vec![det(0.0, 0.0, 10.0, 10.0, 0.5), det(0.0, 0.0, 10.0, 10.0, 0.51)];
        let kept = retain_confident(0.5, MissingConfidence::Drop, frame);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, Some(0.51));
    }

    #[test]
    fn test_missing_confidence_policy() {
        let frame = vec![Detection::new(1, 0.0, 0.0, 5.0, 5.0)];
        assert!(retain_confident(0.1, MissingConfidence::Drop, frame.clone()).is_empty());
        assert_eq!(retain_confident(0.1, MissingConfidence::Keep, frame).len(), 1);
    }

    #[test]
    fn test_confidence_filter_is_idempotent() {
        let frames = vec![
            vec![det(0.0, 0.0, 1.0, 1.0, 0.2), det(0.0, 0.0, 1.0, 1.0, 0.9)],
            vec![det(0.0, 0.0, 1.0, 1.0, 0.7)],
        ];
        let once = confidence_filter(0.6, MissingConfidence::Drop, frames);
        let twice = confidence_filter(0.6, MissingConfidence::Drop, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_iou_suppression_first_seen_wins() {
        let frame = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.3),
            det(1.0, 0.0, 10.0, 10.0, 0.99),
            det(50.0, 50.0, 10.0, 10.0, 0.5),
        ];
        let kept = suppress_overlaps(0.5, frame);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, Some(0.3));
        assert_eq!(kept[1].rect.x, 50.0);
    }

    #[test]
    fn test_removed_box_does_not_suppress() {
        // b overlaps a and c, a and c do not overlap: b goes, c stays.
        let a = det(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = det(4.0, 0.0, 10.0, 10.0, 0.9);
        let c = det(8.0, 0.0, 10.0, 10.0, 0.9);
        assert!(a.iou(&b) > 0.4 && b.iou(&c) > 0.4 && a.iou(&c) < 0.4);
        let kept = suppress_overlaps(0.4, vec![a, b, c]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].rect.x, 8.0);
    }

    #[test]
    fn test_containing_box_removed() {
        let outer = det(0.0, 0.0, 100.0, 100.0, 0.9);
        let inner = det(10.0, 10.0, 20.0, 20.0, 0.9);
        let kept = suppress_containing(vec![outer.clone(), inner.clone()]);
        assert_eq!(kept, vec![inner.clone()]);
        let kept = suppress_containing(vec![inner.clone(), outer]);
        assert_eq!(kept, vec![inner]);
    }

    #[test]
    fn test_identical_boxes_keep_first() {
        let a = det(5.0, 5.0, 10.0, 10.0, 0.4);
        let b = det(5.0, 5.0, 10.0, 10.0, 0.8);
        let kept = suppress_containing(vec![a, b]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, Some(0.4));
    }

    #[test]
    fn test_per_video_filters_keep_frames() {
        let frames = vec![
            vec![det(0.0, 0.0, 10.0, 10.0, 0.9), det(0.0, 0.0, 10.0, 10.0, 0.9)],
            vec![],
        ];
        let out = iou_filter(0.5, frames);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 1);
        assert!(overlap_filter(out)[1].is_empty());
    }

    #[test]
    fn test_apply_runs_enabled_stages() {
        let config = FilterConfig::default();
        let frame = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(10.0, 10.0, 20.0, 20.0, 0.9),
            det(300.0, 300.0, 20.0, 20.0, 0.1),
        ];
        let kept = config.apply(frame.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].rect.x, 10.0);
        assert_eq!(FilterConfig::passthrough().apply(frame).len(), 3);
    }

    proptest! {
        #[test]
        fn iou_filter_leaves_no_overlapping_pair(
            boxes in prop::collection::vec((0.0f32..100.0, 0.0f32..100.0, 1.0f32..40.0, 1.0f32..40.0), 0..12),
            threshold in 0.05f32..0.95,
        ) {
            let frame: Vec<Detection> = boxes
                .into_iter()
                .map(|(x, y, w, h)| det(x, y, w, h, 0.9))
                .collect();
            let kept = suppress_overlaps(threshold, frame);
            for i in 0..kept.len() {
                for j in (i + 1)..kept.len() {
                    prop_assert!(kept[i].iou(&kept[j]) <= threshold);
                }
            }
        }
    }
}
