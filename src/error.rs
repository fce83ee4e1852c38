use thiserror::Error;

/// Everything that can abort a pipeline run.
///
/// All variants are fatal to the current run; none are retried inside the
/// core. A failed run still closes its source and sink, leaving a valid
/// partial artifact.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open video source: {0}")]
    SourceOpen(String),

    #[error("failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("failed to open output sink: {0}")]
    SinkOpen(String),

    #[error("failed to read frame {index}: {reason}")]
    FrameRead { index: u64, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("frame is {got_width}x{got_height} but the sink was opened for {want_width}x{want_height}")]
    DimensionMismatch {
        want_width: u32,
        want_height: u32,
        got_width: u32,
        got_height: u32,
    },

    #[error("failed to write frame to sink: {0}")]
    SinkWrite(String),

    #[error("run cancelled after {frames_written} frames")]
    Cancelled { frames_written: u64 },
}
