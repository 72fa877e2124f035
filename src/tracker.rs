mod border;
mod detection;
mod filter;
mod hist_tracker;
mod history;
mod identity;
mod matching;
mod rect;
mod similarity;

pub use border::{BorderConfig, BorderStage};
pub use detection::{Detection, Histogram, Observation};
pub use filter::{
    FilterConfig, MissingConfidence, confidence_filter, iou_filter, overlap_filter,
    retain_confident, suppress_containing, suppress_overlaps,
};
pub use hist_tracker::{HistTracker, TrackerConfig};
pub use history::{TrackEntry, TrackHistory};
pub use identity::{IdentityAllocator, TrackId};
pub use matching::{
    AGED_COST, AssignmentResult, CostMatrix, PADDING_COST, linear_assignment, solve_assignment,
};
pub use rect::{Rect, iou_batch};
pub use similarity::{
    AppearanceMetric, Correlation, FrameShape, SimilarityScorer, SimilarityTerms,
    SimilarityWeights,
};
