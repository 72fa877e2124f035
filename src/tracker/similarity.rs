//! Track-to-detection dissimilarity combining position, size, overlap and
//! appearance.

use nalgebra::Point2;
use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::tracker::detection::Histogram;
use crate::tracker::rect::Rect;

/// Frame size in pixels, used to normalize distances and areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameShape {
    pub height: u32,
    pub width: u32,
}

impl FrameShape {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn diagonal(&self) -> f32 {
        (self.width as f32).hypot(self.height as f32)
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// Weights of the four similarity terms: distance, size, iou, appearance.
///
/// The weighted sum is divided by the number of terms, not by the sum of the
/// weights. Thresholds tuned against this score depend on that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights(pub [f32; 4]);

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self([1.0, 1.0, 1.0, 1.0])
    }
}

impl SimilarityWeights {
    pub fn distance(&self) -> f32 {
        self.0[0]
    }

    pub fn size(&self) -> f32 {
        self.0[1]
    }

    pub fn iou(&self) -> f32 {
        self.0[2]
    }

    pub fn histogram(&self) -> f32 {
        self.0[3]
    }
}

/// Appearance comparison between two equally shaped feature vectors.
///
/// Implement this to plug in a different appearance model. Results are
/// expected in `[-1, 1]`, higher meaning more alike.
pub trait AppearanceMetric {
    fn compare(&self, a: &Histogram, b: &Histogram) -> f32;
}

/// Pearson correlation between two histograms.
///
/// When either vector has no variance the histograms are considered equal
/// and `1.0` is returned. Vectors of different lengths are compared over
/// their common prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Correlation;

impl AppearanceMetric for Correlation {
    fn compare(&self, a: &Histogram, b: &Histogram) -> f32 {
        let n = a.len().min(b.len());
        if n == 0 {
            return 1.0;
        }
        let a = a.slice(s![..n]).mapv(f64::from);
        let b = b.slice(s![..n]).mapv(f64::from);

        let da = &a - a.sum() / n as f64;
        let db = &b - b.sum() / n as f64;
        let num = da.dot(&db);
        let var_a = da.dot(&da);
        let var_b = db.dot(&db);

        let denom = (var_a * var_b).sqrt();
        if denom > f64::EPSILON {
            (num / denom) as f32
        } else {
            1.0
        }
    }
}

/// The four unweighted terms of a similarity score, each roughly in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTerms {
    pub distance: f32,
    pub size: f32,
    pub iou: f32,
    pub histogram: f32,
}

impl SimilarityTerms {
    pub fn weighted(&self, weights: &SimilarityWeights) -> f32 {
        let terms = [self.distance, self.size, self.iou, self.histogram];
        let sum: f32 = terms.iter().zip(weights.0.iter()).map(|(t, w)| t * w).sum();
        sum / weights.0.len() as f32
    }
}

/// Scores track/detection pairs. Lower scores mean more similar.
#[derive(Debug, Clone)]
pub struct SimilarityScorer<M = Correlation> {
    frame: FrameShape,
    weights: SimilarityWeights,
    metric: M,
}

impl SimilarityScorer<Correlation> {
    pub fn new(frame: FrameShape, weights: SimilarityWeights) -> Self {
        Self::with_metric(frame, weights, Correlation)
    }
}

impl<M: AppearanceMetric> SimilarityScorer<M> {
    pub fn with_metric(frame: FrameShape, weights: SimilarityWeights, metric: M) -> Self {
        Self {
            frame,
            weights,
            metric,
        }
    }

    pub fn frame(&self) -> FrameShape {
        self.frame
    }

    pub fn terms<'a, I>(
        &self,
        track_box: &Rect,
        track_histograms: I,
        candidate_box: &Rect,
        candidate_histogram: &Histogram,
    ) -> SimilarityTerms
    where
        I: IntoIterator<Item = &'a Histogram>,
    {
        let (tx, ty) = track_box.center();
        let (cx, cy) = candidate_box.center();
        let diagonal = self.frame.diagonal();
        let distance = if diagonal > 0.0 {
            nalgebra::distance(&Point2::new(tx, ty), &Point2::new(cx, cy)) / diagonal
        } else {
            0.0
        };

        let frame_area = self.frame.area();
        let size = if frame_area > 0.0 {
            (track_box.area() - candidate_box.area()).abs() / frame_area
        } else {
            0.0
        };

        let iou = 1.0 - track_box.iou(candidate_box);

        let (total, count) = track_histograms
            .into_iter()
            .fold((0.0f32, 0usize), |(total, count), h| {
                (total + self.metric.compare(candidate_histogram, h), count + 1)
            });
        let histogram = if count == 0 {
            1.0
        } else {
            1.0 - total / count as f32
        };

        SimilarityTerms {
            distance,
            size,
            iou,
            histogram,
        }
    }

    /// Weighted dissimilarity between a track and a candidate detection.
    pub fn score<'a, I>(
        &self,
        track_box: &Rect,
        track_histograms: I,
        candidate_box: &Rect,
        candidate_histogram: &Histogram,
    ) -> f32
    where
        I: IntoIterator<Item = &'a Histogram>,
    {
        self.terms(track_box, track_histograms, candidate_box, candidate_histogram)
            .weighted(&self.weights)
    }
}
