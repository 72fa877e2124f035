//! Error type shared by the tracker core and the integration layer.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A detection record did not have 6, 9 or 10 comma-separated fields.
    #[error("line {line}: expected 6, 9 or 10 fields, got {got}")]
    FieldCount { line: usize, got: usize },

    /// A detection record field could not be parsed.
    #[error("line {line}: invalid {field} value `{value}`")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Frames are 1-based and must arrive in non-decreasing order.
    #[error("frame {got} cannot follow frame {previous}")]
    FrameOrder { previous: u32, got: u32 },

    #[error("missing sequence metadata key `{0}`")]
    MissingMetadata(&'static str),

    #[error("invalid sequence metadata `{key}={value}`")]
    InvalidMetadata { key: String, value: String },

    #[error("histogram has {got} bins, expected {expected}")]
    HistogramShape { expected: usize, got: usize },

    #[error("frame {frame} has {detections} detections but {histograms} histograms")]
    ObservationCount {
        frame: u32,
        detections: usize,
        histograms: usize,
    },

    #[error("assignment solver failed on a {size}x{size} matrix: {reason}")]
    Assignment { size: usize, reason: String },

    #[error("invalid configuration: {field} {reason}")]
    Config { field: &'static str, reason: String },

    #[error("failed to read {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Failure reported by an upstream frame source.
    #[error("frame source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }
}
