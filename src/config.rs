use serde::{Deserialize, Serialize};

/// Tunable knobs for one pipeline run. Immutable once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Largest per-channel difference a pixel may show and still count as
    /// uniform (grayscale).
    pub channel_threshold: u8,

    /// Largest percentage of colorful pixels, in `[0, 100]`, for a frame to
    /// still be classified as grayscale. The comparison is strict: a frame
    /// whose colorful-area percentage equals this value is not grayscale.
    pub area_percent_threshold: f32,

    /// Minimum confidence passed to the color-tuned model.
    pub color_confidence: f32,

    /// Minimum confidence passed to the grayscale-tuned model.
    ///
    /// Independent of `color_confidence`: batch runs keep 0.25 while the
    /// interactive front-end lowers this to 0.05.
    pub gray_confidence: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_threshold: 15,
            area_percent_threshold: 5.0,
            color_confidence: 0.25,
            gray_confidence: 0.25,
        }
    }
}
