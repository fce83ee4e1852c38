#[cfg(feature = "opencv")]
pub mod opencv;

use image::RgbImage;

use crate::error::PipelineError;
use crate::models::VideoMeta;

/// Sequential reader yielding frames from a video container in source order.
///
/// Implementations must never yield a zero-sized frame; a container whose
/// stream properties cannot be probed is an open failure, not a stream of
/// broken frames.
pub trait FrameSource: Send {
    /// Stream properties probed at open time.
    fn meta(&self) -> VideoMeta;

    /// The next frame, or `Ok(None)` at end of stream. Malformed frame data
    /// is a [`PipelineError::FrameRead`].
    fn read_next(&mut self) -> Result<Option<RgbImage>, PipelineError>;

    /// Release the container handle. Safe to call more than once.
    fn close(&mut self);
}

/// Sequential writer appending annotated frames to an output container.
///
/// Frames arrive in pipeline order and must be written in that order; the
/// sink performs no reordering or buffering beyond what the container format
/// needs to stay decodable once closed.
pub trait VideoSink: Send {
    /// Append one frame.
    fn append(&mut self, frame: &RgbImage) -> Result<(), PipelineError>;

    /// Flush and release the container handle, leaving a decodable artifact
    /// even when fewer frames than expected were appended. Safe to call more
    /// than once.
    fn close(&mut self) -> Result<(), PipelineError>;
}
