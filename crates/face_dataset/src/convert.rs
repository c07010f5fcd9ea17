//! WIDER FACE -> YOLO layout:
//! `<out>/images/<split>/<flat>.jpg` and `<out>/labels/<split>/<flat>.txt`.

use crate::types::{ConversionSummary, DatasetError, DatasetResult};
use crate::wider::{load_wider_gt, WiderBox, WiderEntry, WiderSplit};
use data_contracts::dataset::{DatasetConfig, YoloBox, FACE_CLASS_ID};
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the dataset description written at the output root.
pub const DATASET_CONFIG_FILE: &str = "face.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub out_root: PathBuf,
    /// Boxes narrower or shorter than this after clipping are skipped.
    pub min_box_px: u32,
    /// Copy images next to the labels; disable to write labels only.
    pub copy_images: bool,
}

impl ConvertOptions {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
            min_box_px: 2,
            copy_images: true,
        }
    }
}

/// `0--Parade/0_Parade_1.jpg` -> `0--Parade_0_Parade_1`.
pub fn flatten_name(image: &Path) -> String {
    let parts: Vec<String> = image
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("_")
}

/// Clip a WIDER box to the image and convert it; `None` if it should be skipped.
fn to_yolo(b: &WiderBox, dims: (u32, u32), min_box_px: u32) -> Option<YoloBox> {
    if b.invalid {
        return None;
    }
    let (iw, ih) = (dims.0 as i64, dims.1 as i64);
    let x0 = b.x.clamp(0, iw);
    let y0 = b.y.clamp(0, ih);
    let x1 = b.x.saturating_add(b.w).clamp(0, iw);
    let y1 = b.y.saturating_add(b.h).clamp(0, ih);
    let (w, h) = (x1 - x0, y1 - y0);
    let min = (min_box_px as i64).max(1);
    if w < min || h < min {
        return None;
    }
    let yolo = YoloBox::from_pixels(
        FACE_CLASS_ID,
        [x0 as f32, y0 as f32, w as f32, h as f32],
        dims,
    );
    yolo.validate().ok().map(|_| yolo)
}

fn convert_entry(
    entry: &WiderEntry,
    split: &WiderSplit,
    images_out: &Path,
    labels_out: &Path,
    opts: &ConvertOptions,
) -> DatasetResult<ConversionSummary> {
    let mut summary = ConversionSummary {
        images: 1,
        ..ConversionSummary::default()
    };
    let src = split.images_dir.join(&entry.image);
    let dims = match image::image_dimensions(&src) {
        Ok(dims) => dims,
        Err(err) => {
            tracing::debug!(image = %src.display(), %err, "image missing or unreadable");
            summary.missing_images = 1;
            return Ok(summary);
        }
    };

    let boxes: Vec<YoloBox> = entry
        .boxes
        .iter()
        .filter_map(|b| to_yolo(b, dims, opts.min_box_px))
        .collect();
    summary.boxes = boxes.len();
    summary.skipped_boxes = entry.boxes.len() - boxes.len();
    if boxes.is_empty() {
        summary.empty_images = 1;
    }

    let name = flatten_name(&entry.image);
    let ext = entry
        .image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let text: String = boxes.iter().map(|b| b.to_line() + "\n").collect();
    let label_path = labels_out.join(format!("{name}.txt"));
    fs::write(&label_path, text).map_err(|e| DatasetError::io(&label_path, e))?;
    if opts.copy_images {
        let dst = images_out.join(format!("{name}.{ext}"));
        fs::copy(&src, &dst).map_err(|e| DatasetError::io(&dst, e))?;
    }
    summary.labels_written = 1;
    Ok(summary)
}

/// Convert one split. Missing images are counted, not fatal.
pub fn convert_split(split: &WiderSplit, opts: &ConvertOptions) -> DatasetResult<ConversionSummary> {
    let entries = load_wider_gt(&split.gt_file)?;
    let images_out = opts.out_root.join("images").join(&split.name);
    let labels_out = opts.out_root.join("labels").join(&split.name);
    for dir in [&images_out, &labels_out] {
        fs::create_dir_all(dir).map_err(|e| DatasetError::io(dir, e))?;
    }

    let parts = entries
        .par_iter()
        .map(|entry| convert_entry(entry, split, &images_out, &labels_out, opts))
        .collect::<DatasetResult<Vec<_>>>()?;
    let mut summary = ConversionSummary {
        split: split.name.clone(),
        ..ConversionSummary::default()
    };
    for part in &parts {
        summary.merge(part);
    }
    tracing::info!(
        split = %split.name,
        images = summary.images,
        labels = summary.labels_written,
        boxes = summary.boxes,
        skipped = summary.skipped_boxes,
        missing = summary.missing_images,
        "split converted"
    );
    Ok(summary)
}

/// Write `face.yaml` at the output root, pointing at the converted splits.
pub fn write_dataset_config(out_root: &Path, train: &str, val: &str) -> DatasetResult<PathBuf> {
    let mut config = DatasetConfig::faces(out_root);
    config.train = format!("images/{train}");
    config.val = format!("images/{val}");
    let path = out_root.join(DATASET_CONFIG_FILE);
    fs::write(&path, config.to_yaml()?).map_err(|e| DatasetError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wb(x: i64, y: i64, w: i64, h: i64) -> WiderBox {
        WiderBox {
            x,
            y,
            w,
            h,
            ..WiderBox::default()
        }
    }

    #[test]
    fn nested_names_are_flattened() {
        assert_eq!(
            flatten_name(Path::new("0--Parade/0_Parade_marchingband_1_849.jpg")),
            "0--Parade_0_Parade_marchingband_1_849"
        );
        assert_eq!(flatten_name(Path::new("plain.jpg")), "plain");
    }

    #[test]
    fn boxes_are_clipped_to_image() {
        let b = to_yolo(&wb(-10, 90, 30, 20), (100, 100), 2).unwrap();
        // Clipped to x 0..20, y 90..100.
        assert_eq!(b.to_line(), "0 0.100000 0.950000 0.200000 0.100000");
    }

    #[test]
    fn invalid_and_tiny_boxes_are_skipped() {
        let mut invalid = wb(10, 10, 20, 20);
        invalid.invalid = true;
        assert!(to_yolo(&invalid, (100, 100), 2).is_none());
        assert!(to_yolo(&wb(10, 10, 1, 20), (100, 100), 2).is_none());
        assert!(to_yolo(&wb(10, 10, 0, 0), (100, 100), 0).is_none());
        assert!(to_yolo(&wb(200, 200, 10, 10), (100, 100), 2).is_none());
    }

    #[test]
    fn corrupt_extents_do_not_overflow() {
        assert!(to_yolo(&wb(i64::MAX - 1, 0, 10, 10), (100, 100), 2).is_none());
        assert!(to_yolo(&wb(i64::MIN + 1, 0, -10, 10), (100, 100), 2).is_none());
        // Saturates to the image edge: x 50..100.
        let b = to_yolo(&wb(50, 0, i64::MAX, 10), (100, 100), 2).unwrap();
        assert_eq!(b.to_line(), "0 0.750000 0.050000 0.500000 0.100000");
    }
}
