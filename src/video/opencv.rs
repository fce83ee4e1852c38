use std::path::Path;

use image::RgbImage;
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoWriter};
use opencv::{core, imgproc};

use super::{FrameSource, VideoSink};
use crate::error::PipelineError;
use crate::models::VideoMeta;

fn path_str(path: &Path) -> Result<&str, PipelineError> {
    path.to_str()
        .ok_or_else(|| PipelineError::SourceOpen(format!("non-UTF-8 path: {}", path.display())))
}

/// Frame source backed by an OpenCV `VideoCapture`.
pub struct OpenCvSource {
    capture: Option<VideoCapture>,
    meta: VideoMeta,
    index: u64,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let open_err = |e: opencv::Error| PipelineError::SourceOpen(e.to_string());

        let capture = VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY).map_err(open_err)?;
        if !capture.is_opened().map_err(open_err)? {
            return Err(PipelineError::SourceOpen(format!(
                "cannot open {}",
                path.display()
            )));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).map_err(open_err)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(open_err)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(open_err)? as u32;
        if fps <= 0.0 || width == 0 || height == 0 {
            return Err(PipelineError::SourceOpen(format!(
                "unsupported or corrupt container: {}x{} @ {} fps",
                width, height, fps
            )));
        }

        // The container's frame count is a hint only; live streams and some
        // codecs report zero or a negative value.
        let count = capture
            .get(videoio::CAP_PROP_FRAME_COUNT)
            .unwrap_or(0.0);
        let frame_count = if count > 0.0 { Some(count as u64) } else { None };

        Ok(Self {
            capture: Some(capture),
            meta: VideoMeta {
                fps,
                width,
                height,
                frame_count,
            },
            index: 0,
        })
    }
}

impl FrameSource for OpenCvSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read_next(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        let read_err = |index: u64| {
            move |e: opencv::Error| PipelineError::FrameRead {
                index,
                reason: e.to_string(),
            }
        };

        let mut bgr = Mat::default();
        let got = capture.read(&mut bgr).map_err(read_err(self.index))?;
        if !got || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(read_err(self.index))?;

        let data = rgb.data_bytes().map_err(read_err(self.index))?.to_vec();
        let frame = RgbImage::from_vec(self.meta.width, self.meta.height, data).ok_or(
            PipelineError::FrameRead {
                index: self.index,
                reason: "frame buffer does not match declared dimensions".to_string(),
            },
        )?;
        self.index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            let _ = capture.release();
        }
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Video sink backed by an OpenCV `VideoWriter` (mp4v container).
pub struct OpenCvSink {
    writer: Option<VideoWriter>,
    width: u32,
    height: u32,
}

impl OpenCvSink {
    pub fn open(path: &Path, fps: f64, width: u32, height: u32) -> Result<Self, PipelineError> {
        let open_err = |e: opencv::Error| PipelineError::SinkOpen(e.to_string());

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v').map_err(open_err)?;
        let writer = VideoWriter::new(
            path_str(path).map_err(|_| {
                PipelineError::SinkOpen(format!("non-UTF-8 path: {}", path.display()))
            })?,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(open_err)?;
        if !writer.is_opened().map_err(open_err)? {
            return Err(PipelineError::SinkOpen(format!(
                "cannot create {}",
                path.display()
            )));
        }

        Ok(Self {
            writer: Some(writer),
            width,
            height,
        })
    }
}

impl VideoSink for OpenCvSink {
    fn append(&mut self, frame: &RgbImage) -> Result<(), PipelineError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(PipelineError::DimensionMismatch {
                want_width: self.width,
                want_height: self.height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::SinkWrite("sink already closed".to_string()))?;
        let write_err = |e: opencv::Error| PipelineError::SinkWrite(e.to_string());

        let data = frame.as_raw();
        let rgb = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                self.height as i32,
                self.width as i32,
                core::CV_8UC3,
                data.as_ptr() as *mut _,
                core::Mat_AUTO_STEP,
            )
        }
        .map_err(write_err)?;
        let mut bgr = Mat::default();
        imgproc::cvt_color(
            &rgb,
            &mut bgr,
            imgproc::COLOR_RGB2BGR,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(write_err)?;

        writer.write(&bgr).map_err(write_err)
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .release()
                .map_err(|e| PipelineError::SinkWrite(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for OpenCvSink {
    fn drop(&mut self) {
        // release is idempotent through the Option guard
        let _ = self.close();
    }
}
