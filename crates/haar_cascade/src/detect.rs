//! Window classification and multi-scale detection.

use crate::error::{CascadeError, CascadeResult};
use crate::group::{group_rectangles, Rect};
use crate::integral::IntegralImage;
use crate::model::{Cascade, HaarFeature, WeakClassifier};
use image::imageops::{self, FilterType};
use image::GrayImage;
use rayon::prelude::*;
use std::borrow::Cow;

/// Candidate similarity used when grouping raw windows.
pub const GROUP_EPS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
    /// Image pyramid step; must be greater than 1.
    pub scale_factor: f64,
    /// Raw windows a detection needs, exclusive. 0 disables grouping.
    pub min_neighbors: u32,
    pub min_size: (u32, u32),
    /// Defaults to the image size.
    pub max_size: Option<(u32, u32)>,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: (0, 0),
            max_size: None,
        }
    }
}

impl DetectParams {
    pub fn validate(&self) -> CascadeResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(CascadeError::Params(format!(
                "scale_factor must be > 1.0, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detected {
    pub rect: Rect,
    pub neighbors: u32,
}

impl Cascade {
    fn feature_value(&self, feature: &HaarFeature, ii: &IntegralImage, ox: i64, oy: i64) -> f64 {
        let mut acc = 0f64;
        for r in &feature.rects {
            let (x, y, w, h) = (ox + r.x as i64, oy + r.y as i64, r.width as i64, r.height as i64);
            let s = if feature.tilted {
                ii.tilted_sum(x, y, w, h)
            } else {
                ii.rect_sum(x, y, w, h)
            };
            acc += r.weight as f64 * s as f64;
        }
        acc
    }

    fn weak_response(
        &self,
        wc: &WeakClassifier,
        ii: &IntegralImage,
        ox: i64,
        oy: i64,
        inv_norm: f64,
    ) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &wc.nodes[idx];
            let value = self.feature_value(&self.features[node.feature], ii, ox, oy) * inv_norm;
            let next = if value < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if next <= 0 {
                return wc.leaves[(-next) as usize];
            }
            idx = next as usize;
        }
    }

    /// Run every stage on the base-size window at `(ox, oy)`.
    ///
    /// The caller guarantees the window lies inside the integral image.
    pub fn classify_window(&self, ii: &IntegralImage, ox: u32, oy: u32) -> bool {
        let (ox, oy) = (ox as i64, oy as i64);
        let (nw, nh) = (self.window.0 as i64 - 2, self.window.1 as i64 - 2);
        let area = (nw * nh) as f64;
        let sum = ii.rect_sum(ox + 1, oy + 1, nw, nh) as f64;
        let sqsum = ii.rect_sqsum(ox + 1, oy + 1, nw, nh);
        let nf = area * sqsum - sum * sum;
        let nf = if nf > 0.0 { nf.sqrt() } else { 1.0 };
        let inv_norm = 1.0 / nf;

        for stage in &self.stages {
            let total: f32 = stage
                .classifiers
                .iter()
                .map(|wc| self.weak_response(wc, ii, ox, oy, inv_norm))
                .sum();
            if total < stage.threshold {
                return false;
            }
        }
        true
    }

    /// Raw candidate windows for one pyramid level, in source-image pixels.
    fn scan_scale(&self, gray: &GrayImage, factor: f64) -> Vec<Rect> {
        let (iw, ih) = gray.dimensions();
        let (cw, ch) = self.window;
        let scaled_w = (iw as f64 / factor).round() as u32;
        let scaled_h = (ih as f64 / factor).round() as u32;
        if scaled_w < cw || scaled_h < ch {
            return Vec::new();
        }
        let level: Cow<'_, GrayImage> = if scaled_w == iw && scaled_h == ih {
            Cow::Borrowed(gray)
        } else {
            Cow::Owned(imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle))
        };
        let ii = IntegralImage::new(&level, self.has_tilted());
        let step = if factor > 2.0 { 1 } else { 2 };
        let win_w = (cw as f64 * factor).round() as i32;
        let win_h = (ch as f64 * factor).round() as i32;

        let mut hits = Vec::new();
        for y in (0..=scaled_h - ch).step_by(step) {
            for x in (0..=scaled_w - cw).step_by(step) {
                if self.classify_window(&ii, x, y) {
                    hits.push(Rect::new(
                        (x as f64 * factor).round() as i32,
                        (y as f64 * factor).round() as i32,
                        win_w,
                        win_h,
                    ));
                }
            }
        }
        hits
    }

    /// Pyramid factors for an image of `dims`, smallest window first.
    pub fn scales(&self, dims: (u32, u32), params: &DetectParams) -> Vec<f64> {
        let (iw, ih) = dims;
        let (cw, ch) = self.window;
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Vec::new();
        }
        let (max_w, max_h) = match params.max_size {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => (iw, ih),
        };
        let mut out = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let win_w = (cw as f64 * factor).round() as u32;
            let win_h = (ch as f64 * factor).round() as u32;
            if win_w > max_w || win_h > max_h {
                break;
            }
            let scaled_w = (iw as f64 / factor).round() as u32;
            let scaled_h = (ih as f64 / factor).round() as u32;
            if scaled_w < cw || scaled_h < ch {
                break;
            }
            if win_w >= params.min_size.0 && win_h >= params.min_size.1 {
                out.push(factor);
            }
            factor *= params.scale_factor;
        }
        out
    }
}

/// Detect objects of every size in `gray`.
///
/// Levels are scanned in parallel; raw windows are merged with
/// [`group_rectangles`] using `params.min_neighbors`.
pub fn detect_multi_scale(
    cascade: &Cascade,
    gray: &GrayImage,
    params: &DetectParams,
) -> CascadeResult<Vec<Detected>> {
    params.validate()?;
    let scales = cascade.scales(gray.dimensions(), params);
    let candidates: Vec<Rect> = scales
        .par_iter()
        .map(|&factor| cascade.scan_scale(gray, factor))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    let grouped = group_rectangles(&candidates, params.min_neighbors, GROUP_EPS);
    tracing::trace!(
        levels = scales.len(),
        candidates = candidates.len(),
        detections = grouped.len(),
        "cascade pass"
    );
    Ok(grouped
        .into_iter()
        .map(|(rect, neighbors)| Detected { rect, neighbors })
        .collect())
}
