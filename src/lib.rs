//! Multi-object box tracking with appearance histograms.
//!
//! Detections are cleaned per frame (confidence, IoU and containment
//! suppression), scored against the track history on position, size, overlap
//! and appearance, and assigned identities through a minimum-cost linear
//! assignment.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Error, Result};
pub use integration::{
    DetectionBuilder, FrameInput, FrameIter, FrameSource, PipelineConfig, SeqInfo,
    TrackerPipeline, VideoOutput, track_videos,
};
pub use tracker::{
    Detection, FilterConfig, FrameShape, HistTracker, Histogram, Observation, Rect, TrackId,
    TrackerConfig,
};
