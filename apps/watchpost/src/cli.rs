use clap::Parser;
use cli_support::common::{ConfigArgs, DetectArgs, RecordArgs};
use cli_support::WatchConfig;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchpost",
    about = "Record clips from a camera while faces or bodies are in view"
)]
pub struct AppArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Camera index to open instead of scanning 0..=max.
    #[arg(long, conflicts_with = "input")]
    pub camera_index: Option<u32>,
    /// Read frames from a video file instead of a camera.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Highest camera index tried while scanning.
    #[arg(long)]
    pub max_camera_index: Option<u32>,
    #[command(flatten)]
    pub detect: DetectArgs,
    #[command(flatten)]
    pub record: RecordArgs,
    /// Write the session report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl AppArgs {
    /// Config file values with CLI overrides applied.
    pub fn resolve_config(&self) -> WatchConfig {
        let mut cfg = self.config.load();
        self.detect.apply(&mut cfg.detect);
        self.record.apply(&mut cfg.record);
        if let Some(index) = self.camera_index {
            cfg.capture.camera_index = Some(index);
            cfg.capture.video_file = None;
        }
        if let Some(input) = &self.input {
            cfg.capture.video_file = Some(input.clone());
        }
        if let Some(max) = self.max_camera_index {
            cfg.capture.max_camera_index = max;
        }
        cfg
    }
}
