#[cfg(feature = "onnx")]
pub mod onnx;

use anyhow::Result;
use image::RgbImage;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{ClassificationDecision, Detection};

/// One inference engine.
///
/// Implementations hold no per-call mutable state visible to callers and are
/// constructed once per run, then reused for every frame.
pub trait Detector: Send {
    /// Run detection on one frame, keeping results at or above
    /// `min_confidence`.
    fn detect(&self, frame: &RgbImage, min_confidence: f32) -> Result<Vec<Detection>>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Routes each frame to the color- or gray-tuned engine.
///
/// Stateless beyond the two engine handles; performs no frame mutation, no
/// retry, and never substitutes the other engine on failure.
pub struct ModelDispatcher {
    color: Box<dyn Detector>,
    gray: Box<dyn Detector>,
    color_confidence: f32,
    gray_confidence: f32,
}

impl ModelDispatcher {
    pub fn new(color: Box<dyn Detector>, gray: Box<dyn Detector>, config: &PipelineConfig) -> Self {
        Self {
            color,
            gray,
            color_confidence: config.color_confidence,
            gray_confidence: config.gray_confidence,
        }
    }

    /// Invoke the engine matching the classifier's decision, with that
    /// engine's own confidence threshold. Engine failures surface unchanged
    /// as [`PipelineError::Inference`].
    pub fn dispatch(
        &self,
        frame: &RgbImage,
        decision: &ClassificationDecision,
    ) -> Result<Vec<Detection>, PipelineError> {
        let (engine, confidence) = if decision.is_grayscale {
            (&self.gray, self.gray_confidence)
        } else {
            (&self.color, self.color_confidence)
        };
        log::debug!(
            "routing frame to {} model ({:.2}% non-uniform)",
            engine.name(),
            decision.non_uniform_ratio
        );
        engine
            .detect(frame, confidence)
            .map_err(|e| PipelineError::Inference(format!("{e:#}")))
    }
}
