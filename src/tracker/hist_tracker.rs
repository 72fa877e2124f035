//! Frame loop: assigns identities to each frame's detections by matching them
//! against the track history.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::tracker::border::{self, BorderConfig, BorderStage};
use crate::tracker::detection::{Detection, Observation};
use crate::tracker::history::TrackHistory;
use crate::tracker::identity::{IdentityAllocator, TrackId};
use crate::tracker::matching::{self, AssignmentResult, CostMatrix};
use crate::tracker::similarity::{
    AppearanceMetric, Correlation, FrameShape, SimilarityScorer, SimilarityWeights,
};

/// Configuration for the HistTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before it can no longer be matched
    pub max_age: u32,
    /// Highest similarity score still accepted as a match
    pub score_threshold: f32,
    /// Histograms kept per track
    pub max_histos: usize,
    pub weights: SimilarityWeights,
    /// Border heuristic; disabled when `None`
    pub border: Option<BorderConfig>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            score_threshold: 0.3,
            max_histos: 10,
            weights: SimilarityWeights::default(),
            border: None,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_histos == 0 {
            return Err(Error::config("max_histos", "must be > 0"));
        }
        if !self.score_threshold.is_finite() {
            return Err(Error::config("score_threshold", "must be finite"));
        }
        if self.score_threshold as f64 >= matching::AGED_COST {
            return Err(Error::config(
                "score_threshold",
                format!("must be below {}", matching::AGED_COST),
            ));
        }
        if self.weights.0.iter().any(|w| !w.is_finite()) {
            return Err(Error::config("weights", "must be finite"));
        }
        if let Some(border) = &self.border {
            if border.margin.is_nan() || border.margin < 0.0 {
                return Err(Error::config("border.margin", "must be >= 0"));
            }
            if border.area_multiplier.is_nan() || border.area_multiplier <= 0.0 {
                return Err(Error::config("border.area_multiplier", "must be > 0"));
            }
        }
        Ok(())
    }
}

/// Identity tracker for a single video.
///
/// Frames must be fed in order. Each tracker owns its history and identity
/// counter, so independent videos can run on independent trackers.
pub struct HistTracker<M = Correlation> {
    history: TrackHistory,
    allocator: IdentityAllocator,
    scorer: SimilarityScorer<M>,
    config: TrackerConfig,
    frame_id: Option<u32>,
    histogram_len: Option<usize>,
}

impl HistTracker<Correlation> {
    pub fn new(config: TrackerConfig, frame: FrameShape) -> Self {
        Self::with_metric(config, frame, Correlation)
    }
}

impl<M: AppearanceMetric> HistTracker<M> {
    pub fn with_metric(config: TrackerConfig, frame: FrameShape, metric: M) -> Self {
        Self {
            history: TrackHistory::new(config.max_histos),
            allocator: IdentityAllocator::new(),
            scorer: SimilarityScorer::with_metric(frame, config.weights, metric),
            config,
            frame_id: None,
            histogram_len: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    /// Number of identities issued so far.
    pub fn identities_issued(&self) -> u64 {
        self.allocator.issued()
    }

    /// Last frame passed to [`update`](Self::update).
    pub fn frame_id(&self) -> Option<u32> {
        self.frame_id
    }

    /// Assign identities to the detections of `frame`.
    ///
    /// Returns every detection in input order with its `id` set. Detections
    /// rejected by the border heuristic carry [`TrackId::Deleted`] and are not
    /// recorded in the history.
    pub fn update(
        &mut self,
        frame: u32,
        mut observations: Vec<Observation>,
    ) -> Result<Vec<Detection>> {
        self.check_frame(frame)?;
        self.check_histograms(&observations)?;
        self.frame_id = Some(frame);

        if observations.is_empty() {
            debug!(frame, tracks = self.history.len(), "empty frame");
            return Ok(Vec::new());
        }

        for obs in observations.iter_mut() {
            obs.detection.frame = frame;
            obs.detection.id = TrackId::Unassigned;
        }

        // Step 1: Border heuristic ahead of matching
        let mut deleted = vec![false; observations.len()];
        if let Some(border) = self.border_at(BorderStage::BeforeMatching) {
            let dets: Vec<&Detection> = observations.iter().map(|o| &o.detection).collect();
            let flagged = border.flag(&dets, self.scorer.frame(), |_, d| {
                border::overlaps_previous_frame(&self.history, d)
            });
            for i in flagged {
                deleted[i] = true;
            }
        }

        let (candidates, positions): (Vec<Observation>, Vec<usize>) = observations
            .iter()
            .enumerate()
            .filter(|(i, _)| !deleted[*i])
            .map(|(i, o)| (o.clone(), i))
            .unzip();

        // Step 2: Match candidates against history, or bootstrap
        let mut ids = vec![TrackId::Unassigned; candidates.len()];
        if self.history.is_empty() {
            for id in ids.iter_mut() {
                *id = TrackId::Assigned(self.allocator.next_id());
            }
            debug!(frame, new = ids.len(), "bootstrapped tracks");
        } else {
            let cost_matrix = CostMatrix::build(
                &self.history,
                &candidates,
                frame,
                self.config.max_age,
                &self.scorer,
            );
            let AssignmentResult {
                matches,
                unmatched_detections,
            } = matching::linear_assignment(&cost_matrix, self.config.score_threshold)?;

            for &(idet, track_id) in &matches {
                ids[idet] = TrackId::Assigned(track_id);
            }
            for &idet in &unmatched_detections {
                let new_id = self.allocator.next_id();
                trace!(frame, detection = idet, id = new_id, "new identity");
                ids[idet] = TrackId::Assigned(new_id);
            }
            debug!(
                frame,
                matched = matches.len(),
                new = unmatched_detections.len(),
                tracks = self.history.len(),
                "frame assigned"
            );
        }

        // Step 3: Border heuristic on the assigned identities
        if let Some(border) = self.border_at(BorderStage::AfterMatching) {
            let dets: Vec<&Detection> = candidates.iter().map(|o| &o.detection).collect();
            let previous = frame - 1;
            let flagged = border.flag(&dets, self.scorer.frame(), |i, _| {
                ids[i]
                    .assigned()
                    .is_some_and(|id| self.history.seen_at(id, previous))
            });
            for i in flagged {
                trace!(frame, id = %ids[i], "border heuristic deleted detection");
                ids[i] = TrackId::Deleted;
            }
        }

        // Step 4: Update history
        for (obs, &id) in candidates.into_iter().zip(&ids) {
            if let TrackId::Assigned(track_id) = id {
                let detection = obs.detection.with_id(id);
                self.history.update(track_id, detection, obs.histogram);
            }
        }

        let mut output: Vec<Detection> = observations
            .into_iter()
            .map(|o| o.detection.with_id(TrackId::Deleted))
            .collect();
        for (pos, id) in positions.into_iter().zip(ids) {
            output[pos].id = id;
        }
        Ok(output)
    }

    fn border_at(&self, stage: BorderStage) -> Option<BorderConfig> {
        self.config.border.filter(|b| b.stage == stage)
    }

    fn check_frame(&self, frame: u32) -> Result<()> {
        let previous = self.frame_id.unwrap_or(0);
        if frame == 0 || frame < previous {
            return Err(Error::FrameOrder {
                previous,
                got: frame,
            });
        }
        Ok(())
    }

    fn check_histograms(&mut self, observations: &[Observation]) -> Result<()> {
        let Some(expected) = self
            .histogram_len
            .or_else(|| observations.first().map(|o| o.histogram.len()))
        else {
            return Ok(());
        };
        if let Some(obs) = observations.iter().find(|o| o.histogram.len() != expected) {
            return Err(Error::HistogramShape {
                expected,
                got: obs.histogram.len(),
            });
        }
        self.histogram_len = Some(expected);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    const FRAME: FrameShape = FrameShape {
        height: 480,
        width: 640,
    };

    fn obs(x: f32, y: f32, w: f32, h: f32, histogram: Array1<f32>) -> Observation {
        Observation::new(Detection::new(0, x, y, w, h).with_confidence(0.9), histogram)
    }

    fn ids(dets: &[Detection]) -> Vec<TrackId> {
        dets.iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_first_frame_assigns_in_order() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        let out = tracker
            .update(
                1,
                vec![
                    obs(10.0, 10.0, 20.0, 20.0, array![1.0, 0.0]),
                    obs(200.0, 200.0, 20.0, 20.0, array![0.0, 1.0]),
                ],
            )
            .unwrap();
        assert_eq!(ids(&out), vec![TrackId::Assigned(1), TrackId::Assigned(2)]);
        assert!(out.iter().all(|d| d.frame == 1));
        assert_eq!(tracker.history().len(), 2);
    }

    #[test]
    fn test_empty_frame_is_noop() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        assert!(tracker.update(1, vec![]).unwrap().is_empty());
        assert!(tracker.history().is_empty());
        assert_eq!(tracker.frame_id(), Some(1));
    }

    #[test]
    fn test_frames_must_not_go_backwards() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        tracker.update(3, vec![]).unwrap();
        assert!(matches!(
            tracker.update(2, vec![]),
            Err(Error::FrameOrder {
                previous: 3,
                got: 2
            })
        ));
        assert!(matches!(
            HistTracker::new(TrackerConfig::default(), FRAME).update(0, vec![]),
            Err(Error::FrameOrder { .. })
        ));
    }

    #[test]
    fn test_histogram_length_is_checked() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        tracker
            .update(1, vec![obs(10.0, 10.0, 20.0, 20.0, array![1.0, 2.0, 3.0])])
            .unwrap();
        let err = tracker
            .update(2, vec![obs(10.0, 10.0, 20.0, 20.0, array![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::HistogramShape {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_dissimilar_detection_gets_new_identity() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        tracker
            .update(1, vec![obs(10.0, 10.0, 20.0, 20.0, array![1.0, 2.0, 3.0])])
            .unwrap();
        let out = tracker
            .update(2, vec![obs(500.0, 400.0, 60.0, 60.0, array![3.0, 2.0, 1.0])])
            .unwrap();
        assert_eq!(ids(&out), vec![TrackId::Assigned(2)]);
        assert_eq!(tracker.identities_issued(), 2);
    }

    #[test]
    fn test_border_heuristic_before_matching() {
        let config = TrackerConfig {
            border: Some(BorderConfig {
                stage: BorderStage::BeforeMatching,
                ..BorderConfig::default()
            }),
            ..TrackerConfig::default()
        };
        let mut tracker = HistTracker::new(config, FRAME);
        let out = tracker
            .update(
                1,
                vec![
                    obs(100.0, 100.0, 10.0, 10.0, array![1.0, 2.0]),
                    obs(300.0, 100.0, 10.0, 10.0, array![1.0, 2.0]),
                    obs(200.0, 200.0, 100.0, 100.0, array![2.0, 1.0]),
                ],
            )
            .unwrap();
        assert_eq!(
            ids(&out),
            vec![TrackId::Assigned(1), TrackId::Assigned(2), TrackId::Deleted]
        );
        assert_eq!(tracker.history().len(), 2);
    }

    #[test]
    fn test_border_heuristic_after_matching_keeps_continuous_tracks() {
        let config = TrackerConfig {
            border: Some(BorderConfig::default()),
            ..TrackerConfig::default()
        };
        let mut tracker = HistTracker::new(config, FRAME);
        let frame = || {
            vec![
                obs(100.0, 100.0, 10.0, 10.0, array![1.0, 2.0, 3.0]),
                obs(300.0, 100.0, 10.0, 10.0, array![3.0, 1.0, 2.0]),
                obs(200.0, 200.0, 100.0, 100.0, array![2.0, 3.0, 1.0]),
            ]
        };
        // The large box has no predecessor on frame 1 and is dropped, wasting id 3.
        let first = tracker.update(1, frame()).unwrap();
        assert_eq!(first[2].id, TrackId::Deleted);
        assert!(tracker.history().get(3).is_none());

        let second = tracker.update(2, frame()).unwrap();
        assert_eq!(second[0].id, TrackId::Assigned(1));
        assert_eq!(second[1].id, TrackId::Assigned(2));
        assert_eq!(second[2].id, TrackId::Deleted);
    }

    #[test]
    fn test_rejected_first_frame_does_not_fix_histogram_length() {
        let mut tracker = HistTracker::new(TrackerConfig::default(), FRAME);
        let err = tracker
            .update(
                1,
                vec![
                    obs(10.0, 10.0, 20.0, 20.0, array![1.0, 2.0, 3.0]),
                    obs(90.0, 10.0, 20.0, 20.0, array![1.0, 2.0]),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, Error::HistogramShape { expected: 3, got: 2 }));

        let out = tracker
            .update(1, vec![obs(10.0, 10.0, 20.0, 20.0, array![1.0, 2.0])])
            .unwrap();
        assert_eq!(ids(&out), vec![TrackId::Assigned(1)]);
    }

    #[test]
    fn test_validate() {
        assert!(TrackerConfig::default().validate().is_ok());
        let bad = TrackerConfig {
            max_histos: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::Config { field: "max_histos", .. })));
        let permissive = TrackerConfig {
            score_threshold: 1e7,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            permissive.validate(),
            Err(Error::Config {
                field: "score_threshold",
                ..
            })
        ));
    }
}
