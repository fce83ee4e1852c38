use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Clamp to a raster of the given dimensions, returning integer corner
    /// coordinates `(x0, y0, x1, y1)`. `None` if the box lies entirely
    /// outside the raster or is degenerate after clamping.
    pub fn clamped(&self, img_width: u32, img_height: u32) -> Option<(u32, u32, u32, u32)> {
        if img_width == 0 || img_height == 0 {
            return None;
        }
        let x0 = self.x.max(0.0) as u32;
        let y0 = self.y.max(0.0) as u32;
        let x1 = (self.right().min(img_width as f32 - 1.0)).max(0.0) as u32;
        let y1 = (self.bottom().min(img_height as f32 - 1.0)).max(0.0) as u32;
        if x0 >= img_width || y0 >= img_height || x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}

/// One detection produced by an inference engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_name: String,
    pub confidence: f32,
}

/// Outcome of the grayscale heuristic for one frame.
///
/// Derived data: recomputed per frame, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationDecision {
    pub is_grayscale: bool,
    /// Percentage of pixels whose channels disagree, in `[0, 100]`.
    pub non_uniform_ratio: f32,
}

/// Stream properties reported by a frame source at open time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Containers do not always know their length (live streams, broken
    /// headers), so the total may be unknown.
    pub frame_count: Option<u64>,
}

/// Pipeline status carried in progress notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_box_stays_inside_raster() {
        let bbox = BoundingBox {
            x: -10.0,
            y: 5.0,
            width: 50.0,
            height: 200.0,
        };
        let (x0, y0, x1, y1) = bbox.clamped(100, 100).unwrap();
        assert_eq!((x0, y0), (0, 5));
        assert!(x1 < 100 && y1 < 100);
    }

    #[test]
    fn box_outside_raster_clamps_to_none() {
        let bbox = BoundingBox {
            x: 500.0,
            y: 500.0,
            width: 20.0,
            height: 20.0,
        };
        assert!(bbox.clamped(100, 100).is_none());
    }
}
