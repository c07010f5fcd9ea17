use anyhow::Context;
use haar_cascade::{detect_multi_scale, Cascade, DetectParams};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vision_core::interfaces::{Detection, DetectionKind, DetectionResult, Detector, Frame};

/// Pyramid and grouping settings for one cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorThresholds {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: (u32, u32),
}

impl DetectorThresholds {
    pub fn face() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (0, 0),
        }
    }

    pub fn body() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: (0, 0),
        }
    }

    pub fn to_params(self) -> DetectParams {
        DetectParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            min_size: self.min_size,
            max_size: None,
        }
    }
}

/// Cascade files for the detectors a session runs.
#[derive(Debug, Clone)]
pub struct CascadePaths {
    pub face: PathBuf,
    pub body: Option<PathBuf>,
}

impl CascadePaths {
    pub const FACE_FILE: &'static str = "haarcascade_frontalface_default.xml";
    pub const BODY_FILE: &'static str = "haarcascade_fullbody.xml";

    /// Standard OpenCV file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            face: dir.join(Self::FACE_FILE),
            body: Some(dir.join(Self::BODY_FILE)),
        }
    }
}

/// Haar cascade behind the `Detector` trait.
pub struct CascadeDetector {
    kind: DetectionKind,
    cascade: Arc<Cascade>,
    params: DetectParams,
}

impl CascadeDetector {
    pub fn new(
        kind: DetectionKind,
        cascade: Arc<Cascade>,
        thresholds: DetectorThresholds,
    ) -> anyhow::Result<Self> {
        let params = thresholds.to_params();
        params.validate()?;
        Ok(Self {
            kind,
            cascade,
            params,
        })
    }

    pub fn load(
        kind: DetectionKind,
        path: &Path,
        thresholds: DetectorThresholds,
    ) -> anyhow::Result<Self> {
        let cascade = Cascade::from_file(path)
            .with_context(|| format!("failed to load {} cascade at {}", kind.as_str(), path.display()))?;
        Self::new(kind, Arc::new(cascade), thresholds)
    }

    /// Detect on an already converted luma plane.
    pub fn detect_gray(&self, frame_id: u64, gray: &GrayImage) -> DetectionResult {
        let found = match detect_multi_scale(&self.cascade, gray, &self.params) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(kind = self.kind.as_str(), %err, "cascade detection failed");
                return DetectionResult::empty(frame_id);
            }
        };
        let (w, h) = gray.dimensions();
        let detections = found
            .into_iter()
            .map(|d| {
                let x0 = d.rect.x.max(0) as u32;
                let y0 = d.rect.y.max(0) as u32;
                Detection {
                    kind: self.kind,
                    bbox_px: [
                        x0.min(w),
                        y0.min(h),
                        (d.rect.right().max(0) as u32).min(w),
                        (d.rect.bottom().max(0) as u32).min(h),
                    ],
                    neighbors: d.neighbors,
                }
            })
            .collect();
        DetectionResult {
            frame_id,
            detections,
        }
    }
}

impl Detector for CascadeDetector {
    fn kind(&self) -> DetectionKind {
        self.kind
    }

    fn detect(&mut self, frame: &Frame) -> DetectionResult {
        self.detect_gray(frame.id, &frame.to_gray())
    }
}

/// All detectors of a session; shares one grayscale conversion per frame.
pub struct DetectorSet {
    detectors: Vec<CascadeDetector>,
}

impl DetectorSet {
    pub fn new(detectors: Vec<CascadeDetector>) -> Self {
        Self { detectors }
    }

    pub fn kinds(&self) -> Vec<DetectionKind> {
        self.detectors.iter().map(|d| d.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detect(&self, frame: &Frame) -> DetectionResult {
        let gray = frame.to_gray();
        let mut result = DetectionResult::empty(frame.id);
        for det in &self.detectors {
            result.merge(det.detect_gray(frame.id, &gray));
        }
        result
    }
}

/// Builds the detector set from cascade files.
///
/// The face cascade is required. A body cascade that fails to load disables
/// body detection with a warning.
pub struct DetectorFactory;

impl DetectorFactory {
    pub fn build(
        &self,
        paths: &CascadePaths,
        face: DetectorThresholds,
        body: DetectorThresholds,
    ) -> anyhow::Result<DetectorSet> {
        let mut detectors = vec![CascadeDetector::load(DetectionKind::Face, &paths.face, face)?];
        tracing::info!(path = %paths.face.display(), "face cascade loaded");
        if let Some(body_path) = &paths.body {
            match CascadeDetector::load(DetectionKind::Body, body_path, body) {
                Ok(det) => {
                    tracing::info!(path = %body_path.display(), "body cascade loaded");
                    detectors.push(det);
                }
                Err(err) => {
                    tracing::warn!(
                        path = %body_path.display(),
                        error = %format!("{err:#}"),
                        "body cascade not available; body detection disabled"
                    );
                }
            }
        }
        Ok(DetectorSet::new(detectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_face_and_body_tuning() {
        assert_eq!(DetectorThresholds::face().min_neighbors, 5);
        assert_eq!(DetectorThresholds::body().min_neighbors, 3);
        assert_eq!(DetectorThresholds::face().to_params().scale_factor, 1.1);
    }

    #[test]
    fn cascade_paths_use_opencv_names() {
        let paths = CascadePaths::in_dir(Path::new("/data"));
        assert_eq!(
            paths.face,
            PathBuf::from("/data/haarcascade_frontalface_default.xml")
        );
        assert_eq!(
            paths.body,
            Some(PathBuf::from("/data/haarcascade_fullbody.xml"))
        );
    }
}
