use image::RgbImage;

use crate::models::ClassificationDecision;

/// Decide whether a frame is predominantly grayscale.
///
/// A pixel counts as colorful when any of the three pairwise channel
/// differences strictly exceeds `channel_threshold`. The frame is grayscale
/// when the percentage of colorful pixels stays strictly below
/// `area_percent_threshold`; a frame sitting exactly on the threshold is not
/// grayscale.
///
/// The percentage is computed over the pixel count, so it reads as "percent
/// of image area". Pure and deterministic: identical inputs always produce
/// the identical decision.
pub fn classify(
    frame: &RgbImage,
    channel_threshold: u8,
    area_percent_threshold: f32,
) -> ClassificationDecision {
    let mut non_uniform: u64 = 0;
    for pixel in frame.pixels() {
        let [r, g, b] = pixel.0;
        if r.abs_diff(g) > channel_threshold
            || r.abs_diff(b) > channel_threshold
            || g.abs_diff(b) > channel_threshold
        {
            non_uniform += 1;
        }
    }

    let total = u64::from(frame.width()) * u64::from(frame.height());
    let non_uniform_ratio = if total == 0 {
        0.0
    } else {
        non_uniform as f32 * 100.0 / total as f32
    };

    ClassificationDecision {
        is_grayscale: non_uniform_ratio < area_percent_threshold,
        non_uniform_ratio,
    }
}
