//! Integration module connecting the tracker to its surroundings.
//!
//! This module provides the MOT-style record format, sequence metadata,
//! the frame source trait for upstream detection/appearance components, and
//! the per-video and multi-video tracking pipelines.

mod builder;
mod detector;
mod pipeline;
pub mod records;
mod seqinfo;

pub use builder::DetectionBuilder;
pub use detector::{FrameInput, FrameIter, FrameSource};
pub use pipeline::{PipelineConfig, TrackedFrame, TrackerPipeline, VideoOutput, track_videos};
pub use records::{format_record, group_by_frame, parse_record, parse_records, read_records};
pub use seqinfo::SeqInfo;
