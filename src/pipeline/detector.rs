//! Seams to the external blob detector and frame source.

use std::fmt::Display;

use crate::error::SourceError;
use crate::tracker::{Detection, Rect};

/// Segmentation backend that turns an image region into blobs.
///
/// Implement this trait to connect any thresholding or connected-component
/// extractor to the sorting line. Implementations are called concurrently from
/// every worker on distinct frames, so they must not hold per-frame state.
///
/// # Example
///
/// ```ignore
/// use sortline::{BlobDetector, Detection, Rect};
///
/// struct HsvDetector {
///     // Thresholds, kernels, ...
/// }
///
/// impl BlobDetector for HsvDetector {
///     type Image = Vec<u8>;
///     type Error = std::io::Error;
///
///     fn detect(&self, image: &Vec<u8>, region: &Rect) -> Result<Vec<Detection>, Self::Error> {
///         // Threshold, clean up and label `region`, then report each component
///         Ok(vec![])
///     }
/// }
/// ```
pub trait BlobDetector: Sync {
    /// Frame payload the detector reads.
    type Image;
    /// Error type for detection failures.
    type Error: Display;

    /// Extract blobs inside `region`, in full-image coordinates.
    fn detect(&self, image: &Self::Image, region: &Rect) -> Result<Vec<Detection>, Self::Error>;
}

/// Producer of frames, in capture order.
pub trait FrameSource: Send {
    type Image: Send;

    /// Next frame, or `Ok(None)` once the stream has ended.
    ///
    /// Return [`SourceError::Skipped`] for a single unreadable frame and
    /// [`SourceError::Unavailable`] when no further frames can be produced.
    fn next_frame(&mut self) -> Result<Option<Self::Image>, SourceError>;
}

/// Any iterator of images is a source that never fails.
pub struct IterSource<I>(pub I);

impl<I> FrameSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Image = I::Item;

    fn next_frame(&mut self) -> Result<Option<Self::Image>, SourceError> {
        Ok(self.0.next())
    }
}
