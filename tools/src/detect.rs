//! Detection on a single still image.

use image::RgbImage;
use inference::DetectorSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use vision_core::interfaces::{DetectionKind, Frame};
use vision_core::overlay::{draw_detections_on, normalize_box};

#[derive(Debug, Clone, Serialize)]
pub struct BoxRecord {
    pub kind: DetectionKind,
    pub bbox_px: [u32; 4],
    pub bbox_norm: Option<[f32; 4]>,
    pub neighbors: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageDetections {
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<BoxRecord>,
}

/// `<dir>/<stem>_boxed.png` next to the input.
pub fn default_out_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{stem}_boxed.png"))
}

/// Run `detectors` on `img`; returns the boxed copy and the detections.
pub fn detect_image(
    detectors: &DetectorSet,
    img: RgbImage,
    path: &Path,
) -> (RgbImage, ImageDetections) {
    let dims = img.dimensions();
    let frame = Frame::from_rgb_image(0, 0.0, img);
    let result = detectors.detect(&frame);

    let mut boxed = frame
        .to_rgb_image()
        .unwrap_or_else(|| RgbImage::new(dims.0, dims.1));
    draw_detections_on(&mut boxed, &result.detections);

    let detections = result
        .detections
        .iter()
        .map(|d| BoxRecord {
            kind: d.kind,
            bbox_px: d.bbox_px,
            bbox_norm: normalize_box(d.bbox_px, dims),
            neighbors: d.neighbors,
        })
        .collect();
    (
        boxed,
        ImageDetections {
            image: path.to_path_buf(),
            width: dims.0,
            height: dims.1,
            detections,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_path_sits_next_to_input() {
        assert_eq!(
            default_out_path(Path::new("shots/door.jpg")),
            PathBuf::from("shots/door_boxed.png")
        );
        assert_eq!(
            default_out_path(Path::new("door.jpg")),
            PathBuf::from("door_boxed.png")
        );
    }
}
