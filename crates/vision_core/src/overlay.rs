use crate::interfaces::{Detection, DetectionKind, Frame};
use image::{Rgb, RgbImage};

pub const FACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const BODY_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
pub const BOX_THICKNESS: u32 = 3;

/// Draw a rectangle border with given thickness. `bbox_px` is inclusive and
/// clamped to the image; the border grows inward.
pub fn draw_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let [x0, y0, x1, y1] = bbox_px;
    let (x1, y1) = (x1.min(w - 1), y1.min(h - 1));
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Normalize an `[x0, y0, x1, y1]` pixel box to `[0, 1]` by image size.
pub fn normalize_box(bbox_px: [u32; 4], dims: (u32, u32)) -> Option<[f32; 4]> {
    let (w, h) = dims;
    if w == 0 || h == 0 {
        return None;
    }
    let [x0, y0, x1, y1] = bbox_px;
    if x1 < x0 || y1 < y0 {
        return None;
    }
    let (wf, hf) = (w as f32, h as f32);
    Some([
        (x0 as f32 / wf).clamp(0.0, 1.0),
        (y0 as f32 / hf).clamp(0.0, 1.0),
        (x1 as f32 / wf).clamp(0.0, 1.0),
        (y1 as f32 / hf).clamp(0.0, 1.0),
    ])
}

pub fn color_for(kind: DetectionKind) -> Rgb<u8> {
    match kind {
        DetectionKind::Face => FACE_COLOR,
        DetectionKind::Body => BODY_COLOR,
    }
}

/// Draw every detection onto an image.
pub fn draw_detections_on(img: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        let [x0, y0, x1, y1] = det.bbox_px;
        if x1 <= x0 || y1 <= y0 {
            continue;
        }
        draw_rect(img, [x0, y0, x1 - 1, y1 - 1], color_for(det.kind), BOX_THICKNESS);
    }
}

/// Draw detections directly into a frame's RGB buffer.
pub fn draw_detections(frame: &mut Frame, detections: &[Detection]) {
    if detections.is_empty() {
        return;
    }
    let Some(mut img) = frame.to_rgb_image() else {
        return;
    };
    draw_detections_on(&mut img, detections);
    frame.rgb = img.into_raw();
}
