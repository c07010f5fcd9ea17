use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{DetectConfig, RecordConfig, WatchConfig};

/// Config file selection shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Config file (defaults to $WATCHPOST_CONFIG, then ./watchpost.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> WatchConfig {
        match &self.config {
            Some(path) => {
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "config file not found; using defaults");
                }
                WatchConfig::load_from(path)
            }
            None => WatchConfig::load(),
        }
    }
}

/// Cascade detector overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct DetectArgs {
    /// Directory holding the OpenCV cascade XML files.
    #[arg(long)]
    pub cascade_dir: Option<PathBuf>,
    /// Pyramid step for both detectors.
    #[arg(long)]
    pub scale_factor: Option<f64>,
    #[arg(long)]
    pub face_min_neighbors: Option<u32>,
    #[arg(long)]
    pub body_min_neighbors: Option<u32>,
    /// Run face detection only.
    #[arg(long, default_value_t = false)]
    pub no_body: bool,
}

impl DetectArgs {
    pub fn apply(&self, cfg: &mut DetectConfig) {
        if let Some(dir) = &self.cascade_dir {
            cfg.cascade_dir = dir.clone();
        }
        if let Some(sf) = self.scale_factor {
            cfg.face.scale_factor = sf;
            cfg.body.scale_factor = sf;
        }
        if let Some(n) = self.face_min_neighbors {
            cfg.face.min_neighbors = n;
        }
        if let Some(n) = self.body_min_neighbors {
            cfg.body.min_neighbors = n;
        }
        if self.no_body {
            cfg.body_enabled = false;
        }
    }
}

/// Clip output overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct RecordArgs {
    /// Directory clips and manifests are written to.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Seconds to keep recording after the last detection.
    #[arg(long, value_parser = parse_post_roll_secs)]
    pub post_roll_secs: Option<f64>,
    #[arg(long)]
    pub fps: Option<f64>,
    /// Stop after this many frames.
    #[arg(long)]
    pub max_frames: Option<u64>,
    /// Draw detection boxes into recorded clips.
    #[arg(long, default_value_t = false)]
    pub draw_boxes: bool,
}

/// Accepts seconds that fit a `Duration` (finite, non-negative).
fn parse_post_roll_secs(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{secs}: {e}"))?;
    Ok(secs)
}

impl RecordArgs {
    pub fn apply(&self, cfg: &mut RecordConfig) {
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(Ok(post_roll)) = self.post_roll_secs.map(Duration::try_from_secs_f64) {
            cfg.post_roll = post_roll;
        }
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if self.max_frames.is_some() {
            cfg.max_frames = self.max_frames;
        }
        if self.draw_boxes {
            cfg.draw_boxes = true;
        }
    }
}
