use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClipManifestSchemaVersion {
    V1,
}

/// Sidecar written next to each recorded clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipManifest {
    pub schema_version: ClipManifestSchemaVersion,
    /// Clip file name, relative to the manifest's directory.
    pub clip: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub frames: u64,
    pub size: (u32, u32),
    pub fps: f64,
    /// Largest face count seen in a single frame of the clip.
    pub peak_faces: usize,
    pub peak_bodies: usize,
    /// Frames of the clip that had at least one detection.
    pub detection_frames: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("clip name is empty")]
    MissingClip,
    #[error("clip ends before it starts")]
    InvalidTimeRange,
    #[error("fps must be positive and finite: {0}")]
    InvalidFps(f64),
    #[error("frame size must be non-zero: {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("detection frames ({detections}) exceed clip frames ({frames})")]
    DetectionFrames { detections: u64, frames: u64 },
    #[error("post-roll must be non-negative: {0}")]
    InvalidPostRoll(f64),
    #[error("at least one detector is required")]
    NoDetectors,
    #[error("max_frames cannot be zero")]
    ZeroMaxFrames,
    #[error("yolo label line has {0} fields, expected 5")]
    YoloFieldCount(usize),
    #[error("yolo label field {field} is not a number: {value}")]
    YoloParse { field: &'static str, value: String },
    #[error("yolo box out of range: {0:?}")]
    YoloOutOfRange([f32; 4]),
}

impl ClipManifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.clip.trim().is_empty() {
            return Err(ValidationError::MissingClip);
        }
        if self.ended_at < self.started_at {
            return Err(ValidationError::InvalidTimeRange);
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ValidationError::InvalidFps(self.fps));
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(ValidationError::InvalidSize(self.size.0, self.size.1));
        }
        if self.detection_frames > self.frames {
            return Err(ValidationError::DetectionFrames {
                detections: self.detection_frames,
                frames: self.frames,
            });
        }
        Ok(())
    }

    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
