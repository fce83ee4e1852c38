use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::models::Detection;

static FONT_BYTES: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 16.0;
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_PADDING: u32 = 2;

/// Small fixed palette; the class name picks the entry, so the same class is
/// always drawn in the same color.
const PALETTE: [Rgb<u8>; 4] = [
    Rgb([230, 70, 20]),  // orange-red
    Rgb([60, 130, 240]), // blue
    Rgb([40, 170, 80]),  // green
    Rgb([200, 60, 200]), // magenta
];

fn color_for_class(class_name: &str) -> Rgb<u8> {
    let hash = class_name
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// Overlay every detection onto a copy of the frame.
///
/// Detections are drawn in the order given; overlapping boxes overdraw
/// earlier ones (last write wins). The returned raster always has the same
/// dimensions as the input, including for an empty detection list.
pub fn annotate(frame: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = frame.clone();
    if detections.is_empty() {
        return out;
    }

    let font = FontRef::try_from_slice(FONT_BYTES).expect("bundled font is valid");
    for detection in detections {
        draw_detection(&mut out, detection, &font);
    }
    out
}

fn draw_detection(img: &mut RgbImage, detection: &Detection, font: &FontRef) {
    let Some((x0, y0, x1, y1)) = detection.bbox.clamped(img.width(), img.height()) else {
        return;
    };
    let color = color_for_class(&detection.class_name);

    // Thick hollow box, grown outward ring by ring.
    for t in 0..BOX_THICKNESS {
        let rect = Rect::at(x0 as i32 - t, y0 as i32 - t)
            .of_size(x1 - x0 + 2 * t as u32, y1 - y0 + 2 * t as u32);
        draw_hollow_rect_mut(img, rect, color);
    }

    let label = format!("{} {:.2}", detection.class_name, detection.confidence);
    let scale = PxScale::from(LABEL_SCALE);
    let (text_width, text_height) = text_size(scale, font, &label);

    // Label sits above the box when there is room, inside it otherwise.
    let bg_height = text_height + 2 * LABEL_PADDING;
    let bg_y = y0.saturating_sub(bg_height);
    let bg_x = x0.saturating_sub(BOX_THICKNESS as u32 - 1);

    for dx in 0..(text_width + 2 * LABEL_PADDING) {
        for dy in 0..bg_height {
            let px = bg_x + dx;
            let py = bg_y + dy;
            if px < img.width() && py < img.height() {
                img.put_pixel(px, py, color);
            }
        }
    }
    draw_text_mut(
        img,
        LABEL_TEXT_COLOR,
        (bg_x + LABEL_PADDING) as i32,
        (bg_y + LABEL_PADDING) as i32,
        scale,
        font,
        &label,
    );
}
