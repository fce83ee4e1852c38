use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::{Rgb, RgbImage};

use firewatch::{
    BoundingBox, Detection, Detector, FrameSource, PipelineError, ProgressObserver, RunStatus,
    VideoMeta, VideoSink,
};

pub fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Uniform frame with all three channels equal: always classified grayscale.
pub fn gray_frame(width: u32, height: u32, value: u8) -> RgbImage {
    solid_frame(width, height, [value, value, value])
}

/// Fully saturated frame: every pixel is non-uniform.
pub fn red_frame(width: u32, height: u32) -> RgbImage {
    solid_frame(width, height, [255, 0, 0])
}

pub fn detection(x: f32, y: f32, width: f32, height: f32, class: &str, confidence: f32) -> Detection {
    Detection {
        bbox: BoundingBox {
            x,
            y,
            width,
            height,
        },
        class_name: class.to_string(),
        confidence,
    }
}

/// In-memory frame source over a fixed frame list.
pub struct VecSource {
    frames: VecDeque<RgbImage>,
    meta: VideoMeta,
    fail_at: Option<u64>,
    index: u64,
    closed: Arc<AtomicUsize>,
}

impl VecSource {
    /// Meta is derived from the first frame; 30 fps, known total.
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let first = frames.first().expect("VecSource needs at least one frame");
        let meta = VideoMeta {
            fps: 30.0,
            width: first.width(),
            height: first.height(),
            frame_count: Some(frames.len() as u64),
        };
        Self {
            frames: frames.into(),
            meta,
            fail_at: None,
            index: 0,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_unknown_total(mut self) -> Self {
        self.meta.frame_count = None;
        self
    }

    /// Fail the read of the frame at this zero-based index.
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closed.clone()
    }
}

impl FrameSource for VecSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read_next(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        if self.fail_at == Some(self.index) {
            return Err(PipelineError::FrameRead {
                index: self.index,
                reason: "synthetic read failure".to_string(),
            });
        }
        self.index += 1;
        Ok(self.frames.pop_front())
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink recording every appended frame; clones share the same storage so a
/// test can keep a probe handle after moving the sink into the pipeline.
#[derive(Clone)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<RgbImage>>>,
    closed: Arc<AtomicUsize>,
    fail_on_append: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
            fail_on_append: None,
        }
    }

    /// Fail the append of the frame at this zero-based index.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_on_append = Some(index);
        self
    }

    pub fn frames(&self) -> Vec<RgbImage> {
        self.frames.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl VideoSink for MemorySink {
    fn append(&mut self, frame: &RgbImage) -> Result<(), PipelineError> {
        let mut frames = self.frames.lock().unwrap();
        if self.fail_on_append == Some(frames.len()) {
            return Err(PipelineError::SinkWrite(
                "synthetic write failure".to_string(),
            ));
        }
        frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Detector returning a scripted result, counting its invocations.
pub struct FakeDetector {
    label: &'static str,
    detections: Vec<Detection>,
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
}

impl FakeDetector {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            detections: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on_call: None,
        }
    }

    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    /// Fail on the nth call to this engine (zero-based).
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn call_count(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Detector for FakeDetector {
    fn detect(&self, _frame: &RgbImage, min_confidence: f32) -> Result<Vec<Detection>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            anyhow::bail!("synthetic inference failure");
        }
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= min_confidence)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        self.label
    }
}

/// Observer recording every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<(u64, Option<u64>, RunStatus)>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(u64, Option<u64>, RunStatus)> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<RunStatus> {
        self.events.lock().unwrap().last().map(|e| e.2)
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, frames_done: u64, total_frames: Option<u64>, status: RunStatus) {
        self.events
            .lock()
            .unwrap()
            .push((frames_done, total_frames, status));
    }
}
