pub mod annotate;
pub mod classify;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod video;

pub use annotate::annotate;
pub use classify::classify;
pub use config::PipelineConfig;
pub use detection::{Detector, ModelDispatcher};
pub use error::PipelineError;
pub use models::{BoundingBox, ClassificationDecision, Detection, RunStatus, VideoMeta};
pub use pipeline::{
    CancelToken, NoopObserver, Pipeline, PipelineState, ProgressObserver, RunSummary,
};
pub use video::{FrameSource, VideoSink};

#[cfg(feature = "gui")]
pub mod gui;
