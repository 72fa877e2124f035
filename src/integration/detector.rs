//! Trait for upstream components that supply per-frame detections and their
//! appearance histograms.

use crate::error::{Error, Result};
use crate::tracker::{Detection, Histogram, Observation};

/// Everything the tracker consumes for one frame.
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// 1-based frame number
    pub frame: u32,
    pub observations: Vec<Observation>,
}

impl FrameInput {
    pub fn new(frame: u32, observations: Vec<Observation>) -> Self {
        Self {
            frame,
            observations,
        }
    }

    /// Pair detections with histograms computed for them, in order.
    pub fn from_parts(
        frame: u32,
        detections: Vec<Detection>,
        histograms: Vec<Histogram>,
    ) -> Result<Self> {
        if detections.len() != histograms.len() {
            return Err(Error::ObservationCount {
                frame,
                detections: detections.len(),
                histograms: histograms.len(),
            });
        }
        let observations = detections
            .into_iter()
            .zip(histograms)
            .map(|(d, h)| Observation::new(d, h))
            .collect();
        Ok(Self::new(frame, observations))
    }
}

/// Source of frames for one video.
///
/// Implement this to connect frame decoding, detection and appearance
/// feature extraction to the tracker.
///
/// # Example
///
/// ```ignore
/// use boxtrack_rs::{FrameInput, FrameSource};
///
/// struct MySource {
///     // Decoder, detector and histogram extractor here
/// }
///
/// impl FrameSource for MySource {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<FrameInput>, Self::Error> {
///         // Decode the next frame, detect boxes, compute histograms
///         Ok(None)
///     }
/// }
/// ```
pub trait FrameSource {
    /// Error type for source failures.
    type Error;

    /// Produce the next frame, or `None` once the video is exhausted.
    fn next_frame(&mut self) -> Result<Option<FrameInput>, Self::Error>;
}

/// Adapts an iterator of already materialized frames into a [`FrameSource`].
#[derive(Debug, Clone)]
pub struct FrameIter<I>(pub I);

impl<I: Iterator<Item = FrameInput>> FrameSource for FrameIter<I> {
    type Error = std::convert::Infallible;

    fn next_frame(&mut self) -> Result<Option<FrameInput>, Self::Error> {
        Ok(self.0.next())
    }
}

impl From<Vec<FrameInput>> for FrameIter<std::vec::IntoIter<FrameInput>> {
    fn from(frames: Vec<FrameInput>) -> Self {
        FrameIter(frames.into_iter())
    }
}
