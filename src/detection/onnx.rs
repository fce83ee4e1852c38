use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use image::RgbImage;
use ndarray::Array;
use ort::session::Session;
use ort::value::Value;

use super::Detector;
use crate::error::PipelineError;
use crate::models::{BoundingBox, Detection};

const MODEL_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.45;

/// YOLO-family detector backed by an ONNX Runtime session.
///
/// The session is created once and reused for every frame of a run. Frames
/// are letterboxed to the model's square input; detections are mapped back
/// into source pixel coordinates.
pub struct OnnxDetector {
    // `Session::run` needs exclusive access; the pipeline is sequential, so
    // this lock is never contended within a run.
    session: Mutex<Session>,
    label: String,
    class_names: Vec<String>,
}

impl OnnxDetector {
    /// Load a model from disk. `label` names the engine in logs
    /// ("color"/"gray"); `class_names` is the fallback when the model
    /// metadata carries none.
    pub fn from_file(
        model_path: &Path,
        label: &str,
        class_names: Vec<String>,
    ) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                PipelineError::ModelLoad(format!("{}: {e}", model_path.display()))
            })?;

        let class_names = metadata_class_names(&session).unwrap_or(class_names);
        log::info!(
            "loaded {label} model from {} ({} classes)",
            model_path.display(),
            class_names.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            label: label.to_string(),
            class_names,
        })
    }

    fn class_name(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{class_id}"))
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, frame: &RgbImage, min_confidence: f32) -> Result<Vec<Detection>> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), MODEL_SIZE);
        let input = preprocess(frame, &letterbox);

        let input_value =
            Value::from_array(input).map_err(|e| anyhow!("failed to build input tensor: {e}"))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("inference session poisoned"))?;
        let outputs = session
            .run(ort::inputs!["images" => &input_value])
            .map_err(|e| anyhow!("inference failed: {e}"))?;
        let output = outputs["output0"]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("failed to extract output tensor: {e}"))?;
        let output = Array::from_shape_vec(output.shape(), output.iter().cloned().collect())
            .context("output tensor has inconsistent shape")?;

        let raw = postprocess(&output, min_confidence, &letterbox, |id| self.class_name(id))?;
        Ok(nms(raw, IOU_THRESHOLD))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Scale and offsets used to center a frame inside the square model input.
struct Letterbox {
    scale: f32,
    x_offset: u32,
    y_offset: u32,
    new_width: u32,
    new_height: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let max_dim = width.max(height).max(1);
        let scale = target as f32 / max_dim as f32;
        let new_width = ((width as f32 * scale) as u32).max(1);
        let new_height = ((height as f32 * scale) as u32).max(1);
        Self {
            scale,
            x_offset: (target - new_width) / 2,
            y_offset: (target - new_height) / 2,
            new_width,
            new_height,
        }
    }
}

/// Letterbox the frame to `MODEL_SIZE` with gray padding and convert to a
/// normalized NCHW tensor.
fn preprocess(frame: &RgbImage, letterbox: &Letterbox) -> Array<f32, ndarray::IxDyn> {
    let resized = image::imageops::resize(
        frame,
        letterbox.new_width,
        letterbox.new_height,
        image::imageops::FilterType::Triangle,
    );

    let mut boxed = RgbImage::from_pixel(MODEL_SIZE, MODEL_SIZE, image::Rgb([114, 114, 114]));
    image::imageops::overlay(
        &mut boxed,
        &resized,
        i64::from(letterbox.x_offset),
        i64::from(letterbox.y_offset),
    );

    let size = MODEL_SIZE as usize;
    let mut input_data = Vec::with_capacity(3 * size * size);
    for c in 0..3 {
        for y in 0..MODEL_SIZE {
            for x in 0..MODEL_SIZE {
                input_data.push(boxed.get_pixel(x, y)[c] as f32 / 255.0);
            }
        }
    }
    Array::from_shape_vec(ndarray::IxDyn(&[1, 3, size, size]), input_data)
        .expect("tensor length matches declared shape")
}

/// Decode a `[1, 4 + num_classes, num_boxes]` YOLO output: center-form boxes,
/// per-box class argmax, confidence filter, letterbox unmapping.
fn postprocess(
    output: &Array<f32, ndarray::IxDyn>,
    min_confidence: f32,
    letterbox: &Letterbox,
    class_name: impl Fn(usize) -> String,
) -> Result<Vec<Detection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[1] < 5 {
        return Err(anyhow!(
            "unexpected output shape {shape:?}, want [1, 4 + classes, boxes]"
        ));
    }
    let num_classes = shape[1] - 4;
    let num_boxes = shape[2];

    let mut detections = Vec::new();
    for i in 0..num_boxes {
        let mut best_class = 0;
        let mut best_confidence = 0.0f32;
        for class_idx in 0..num_classes {
            let confidence = output[[0, 4 + class_idx, i]];
            if confidence > best_confidence {
                best_confidence = confidence;
                best_class = class_idx;
            }
        }
        if best_confidence < min_confidence {
            continue;
        }

        let x_center = output[[0, 0, i]];
        let y_center = output[[0, 1, i]];
        let width = output[[0, 2, i]];
        let height = output[[0, 3, i]];

        // model space -> source pixel space
        let x = (x_center - width / 2.0 - letterbox.x_offset as f32) / letterbox.scale;
        let y = (y_center - height / 2.0 - letterbox.y_offset as f32) / letterbox.scale;
        let width = width / letterbox.scale;
        let height = height / letterbox.scale;

        detections.push(Detection {
            bbox: BoundingBox {
                x: x.max(0.0),
                y: y.max(0.0),
                width,
                height,
            },
            class_name: class_name(best_class),
            confidence: best_confidence,
        });
    }
    Ok(detections)
}

/// Class-wise non-maximum suppression, keeping the most confident box among
/// overlapping same-class candidates.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let overlaps = keep.iter().any(|kept| {
            kept.class_name == candidate.class_name
                && iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = a.right().min(b.right());
    let y1 = a.bottom().min(b.bottom());
    let intersection = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Ultralytics exports embed class names as a dict-like string under the
/// `names` metadata key, e.g. `{0: 'fire', 1: 'smoke'}`.
fn metadata_class_names(session: &Session) -> Option<Vec<String>> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").ok()??;
    let names: Vec<String> = raw
        .trim_matches(['{', '}'])
        .split(',')
        .filter_map(|entry| {
            let (_, value) = entry.split_once(':')?;
            Some(value.trim().trim_matches(['\'', '"']).to_string())
        })
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() { None } else { Some(names) }
}
