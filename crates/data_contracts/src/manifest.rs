use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionManifestSchemaVersion {
    V1,
}

/// Written once per watch session into the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManifest {
    pub schema_version: SessionManifestSchemaVersion,
    /// Human-readable input description (device path or video file).
    pub camera: String,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Local>,
    pub post_roll_secs: f64,
    pub fps: f64,
    /// Detector kinds active for the session ("face", "body").
    pub detectors: Vec<String>,
    pub max_frames: Option<u64>,
}

impl SessionManifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.post_roll_secs.is_nan() || self.post_roll_secs < 0.0 {
            return Err(ValidationError::InvalidPostRoll(self.post_roll_secs));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ValidationError::InvalidFps(self.fps));
        }
        if self.detectors.is_empty() {
            return Err(ValidationError::NoDetectors);
        }
        if self.max_frames == Some(0) {
            return Err(ValidationError::ZeroMaxFrames);
        }
        Ok(())
    }
}
