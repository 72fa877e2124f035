//! TrackerPipeline for running filtering and tracking over whole videos.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::FrameSource;
use super::records::format_record;
use crate::error::{Error, Result};
use crate::tracker::{
    AppearanceMetric, Correlation, Detection, FilterConfig, FrameShape, HistTracker, TrackId,
    TrackerConfig,
};

/// Filter and tracker settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filters: FilterConfig,
    pub tracker: TrackerConfig,
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.confidence_threshold.is_some_and(f32::is_nan) {
            return Err(Error::config("filters.confidence_threshold", "must not be NaN"));
        }
        if self.filters.iou_threshold.is_some_and(f32::is_nan) {
            return Err(Error::config("filters.iou_threshold", "must not be NaN"));
        }
        self.tracker.validate()
    }
}

/// Tracked detections of one frame.
#[derive(Debug, Clone)]
pub struct TrackedFrame {
    pub frame: u32,
    pub detections: Vec<Detection>,
}

/// Result of tracking one video.
#[derive(Debug, Clone, Default)]
pub struct VideoOutput {
    pub frames: Vec<TrackedFrame>,
    /// Number of identities issued over the run
    pub identities: u64,
}

impl VideoOutput {
    /// Flat list of output records, skipping detections marked for deletion.
    pub fn records(&self) -> Vec<String> {
        self.detections().map(format_record).collect()
    }

    /// Every kept detection, in frame order.
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.frames
            .iter()
            .flat_map(|f| f.detections.iter())
            .filter(|d| d.id != TrackId::Deleted)
    }
}

/// Filtering and identity tracking for a single video.
///
/// Bundles a [`FrameSource`] with the per-frame filter stages and a
/// [`HistTracker`].
pub struct TrackerPipeline<S: FrameSource, M = Correlation> {
    source: S,
    filters: FilterConfig,
    tracker: HistTracker<M>,
}

impl<S> TrackerPipeline<S, Correlation>
where
    S: FrameSource,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    /// Create a new pipeline over `source`, whose frames have size `frame`.
    pub fn new(source: S, config: PipelineConfig, frame: FrameShape) -> Self {
        Self::with_metric(source, config, frame, Correlation)
    }
}

impl<S, M> TrackerPipeline<S, M>
where
    S: FrameSource,
    S::Error: std::error::Error + Send + Sync + 'static,
    M: AppearanceMetric,
{
    pub fn with_metric(source: S, config: PipelineConfig, frame: FrameShape, metric: M) -> Self {
        Self {
            source,
            filters: config.filters,
            tracker: HistTracker::with_metric(config.tracker, frame, metric),
        }
    }

    /// Pull, filter and track the next frame.
    ///
    /// # Returns
    /// The tracked frame, `None` once the source is exhausted, or an error
    /// from the source or the tracker.
    pub fn process_frame(&mut self) -> Result<Option<TrackedFrame>> {
        let Some(input) = self
            .source
            .next_frame()
            .map_err(|e| Error::Source(Box::new(e)))?
        else {
            return Ok(None);
        };

        let raw = input.observations.len();
        let observations = self.filters.apply(input.observations);
        debug!(
            frame = input.frame,
            kept = observations.len(),
            dropped = raw - observations.len(),
            "filtered detections"
        );

        let detections = self.tracker.update(input.frame, observations)?;
        Ok(Some(TrackedFrame {
            frame: input.frame,
            detections,
        }))
    }

    /// Track every remaining frame of the source.
    pub fn run(mut self) -> Result<VideoOutput> {
        let mut frames = Vec::new();
        while let Some(frame) = self.process_frame()? {
            frames.push(frame);
        }
        let identities = self.tracker.identities_issued();
        info!(frames = frames.len(), identities, "video tracked");
        Ok(VideoOutput { frames, identities })
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &HistTracker<M> {
        &self.tracker
    }
}

/// Track independent videos in parallel.
///
/// Every video gets its own tracker and identity counter; results are
/// returned in input order.
pub fn track_videos<S>(
    videos: Vec<(S, FrameShape)>,
    config: &PipelineConfig,
) -> Vec<Result<VideoOutput>>
where
    S: FrameSource + Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    videos
        .into_par_iter()
        .map(|(source, frame)| TrackerPipeline::new(source, config.clone(), frame).run())
        .collect()
}
