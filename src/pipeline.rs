use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::annotate;
use crate::classify;
use crate::config::PipelineConfig;
use crate::detection::ModelDispatcher;
use crate::error::PipelineError;
use crate::models::{RunStatus, VideoMeta};
use crate::video::{FrameSource, VideoSink};

/// Receives a notification after every processed frame and once on
/// termination. Purely an output channel: the pipeline never blocks on an
/// observer and never consumes a return value from it.
pub trait ProgressObserver: Send {
    fn on_progress(&self, frames_done: u64, total_frames: Option<u64>, status: RunStatus);
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _frames_done: u64, _total_frames: Option<u64>, _status: RunStatus) {}
}

/// Cooperative cancellation flag, checked between frames only. Cloning yields
/// another handle to the same flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Source, sink, and model handles are acquired while the pipeline is
    /// being built; [`Pipeline::new`] returns an instance already past this
    /// state, or the open error.
    Opening,
    Running,
    Completed,
    Failed,
    Closed,
}

/// Counters reported after a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub grayscale_frames: u64,
    pub color_frames: u64,
    pub detections: u64,
}

/// The adaptive classification-and-dispatch pipeline.
///
/// Owns the source, sink, and both model handles for exactly one run:
/// [`Pipeline::run`] consumes the instance, so reprocessing requires building
/// a fresh one. The frame loop is strictly sequential; frames are appended in
/// source order, one annotated frame per frame read.
pub struct Pipeline {
    source: Box<dyn FrameSource>,
    sink: Box<dyn VideoSink>,
    dispatcher: ModelDispatcher,
    config: PipelineConfig,
    observer: Box<dyn ProgressObserver>,
    cancel: CancelToken,
    state: PipelineState,
    meta: VideoMeta,
}

impl Pipeline {
    /// Compose an opened source, an opened sink, and a loaded model pair.
    ///
    /// Fails with [`PipelineError::SourceOpen`] when the source reports
    /// stream properties no sink could be opened for.
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: Box<dyn VideoSink>,
        dispatcher: ModelDispatcher,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let meta = source.meta();
        if meta.width == 0 || meta.height == 0 || meta.fps <= 0.0 {
            return Err(PipelineError::SourceOpen(format!(
                "invalid stream properties: {}x{} @ {} fps",
                meta.width, meta.height, meta.fps
            )));
        }
        Ok(Self {
            source,
            sink,
            dispatcher,
            config,
            observer: Box::new(NoopObserver),
            cancel: CancelToken::new(),
            state: PipelineState::Idle,
            meta,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn meta(&self) -> VideoMeta {
        self.meta
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Process the whole stream: read → classify → dispatch → annotate →
    /// append, one frame at a time, in order.
    ///
    /// On every exit path, including errors and cancellation, the source and
    /// sink are released exactly once, so a failed run leaves a valid partial
    /// artifact containing every frame appended before the failure.
    pub fn run(mut self) -> Result<RunSummary, PipelineError> {
        self.state = PipelineState::Running;
        info!(
            "processing {}x{} @ {:.1} fps, {} frames",
            self.meta.width,
            self.meta.height,
            self.meta.fps,
            self.meta
                .frame_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        );

        let total = self.meta.frame_count;
        let mut summary = RunSummary::default();
        let mut outcome = self.process_frames(&mut summary);

        // Release discipline: both handles closed on every exit path.
        self.source.close();
        if let Err(close_err) = self.sink.close() {
            // a failed flush invalidates an otherwise clean run
            if outcome.is_ok() {
                outcome = Err(close_err);
            }
        }

        match outcome {
            Ok(()) => {
                self.state = PipelineState::Completed;
                self.observer
                    .on_progress(summary.frames, total, RunStatus::Completed);
                info!(
                    "completed: {} frames ({} grayscale, {} color), {} detections",
                    summary.frames,
                    summary.grayscale_frames,
                    summary.color_frames,
                    summary.detections
                );
                self.state = PipelineState::Closed;
                Ok(summary)
            }
            Err(err) => {
                self.state = PipelineState::Failed;
                self.observer
                    .on_progress(summary.frames, total, RunStatus::Failed);
                info!("failed after {} frames: {}", summary.frames, err);
                self.state = PipelineState::Closed;
                Err(err)
            }
        }
    }

    fn process_frames(&mut self, summary: &mut RunSummary) -> Result<(), PipelineError> {
        let total = self.meta.frame_count;
        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    frames_written: summary.frames,
                });
            }

            let frame = match self.source.read_next()? {
                Some(frame) => frame,
                None => return Ok(()),
            };
            if frame.width() != self.meta.width || frame.height() != self.meta.height {
                return Err(PipelineError::DimensionMismatch {
                    want_width: self.meta.width,
                    want_height: self.meta.height,
                    got_width: frame.width(),
                    got_height: frame.height(),
                });
            }

            let decision = classify::classify(
                &frame,
                self.config.channel_threshold,
                self.config.area_percent_threshold,
            );
            if decision.is_grayscale {
                summary.grayscale_frames += 1;
            } else {
                summary.color_frames += 1;
            }

            let detections = self.dispatcher.dispatch(&frame, &decision)?;
            summary.detections += detections.len() as u64;

            let annotated = annotate::annotate(&frame, &detections);
            self.sink.append(&annotated)?;
            summary.frames += 1;

            debug!(
                "frame {}: {} ({:.2}% non-uniform), {} detections",
                summary.frames,
                if decision.is_grayscale {
                    "grayscale"
                } else {
                    "color"
                },
                decision.non_uniform_ratio,
                detections.len()
            );
            self.observer
                .on_progress(summary.frames, total, RunStatus::Running);
        }
    }
}
