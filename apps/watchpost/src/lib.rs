//! Watchpost app wiring: config -> detectors -> camera -> watch loop.

pub mod cli;
pub mod shutdown;

use anyhow::Context;
use capture_utils::{
    find_camera, probe_input, CameraSpec, FfmpegRecorderFactory, FfmpegSource, InputSpec,
    SourceOptions, StreamInfo,
};
use cli_support::config::{CaptureConfig, DetectConfig, WatchConfig};
use inference::{CascadePaths, DetectorFactory, DetectorSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use vision_core::prelude::CaptureLimit;
use watch_core::{SessionReport, SystemClock, WatchOptions, Watcher};

pub fn build_detectors(cfg: &DetectConfig) -> anyhow::Result<DetectorSet> {
    let mut paths = CascadePaths::in_dir(&cfg.cascade_dir);
    if !cfg.body_enabled {
        paths.body = None;
    }
    DetectorFactory.build(&paths, cfg.face, cfg.body)
}

/// Resolve the configured input and probe its stream.
pub fn open_input(cfg: &CaptureConfig) -> anyhow::Result<(InputSpec, StreamInfo)> {
    if let Some(file) = &cfg.video_file {
        let input = InputSpec::File(file.clone());
        let info = probe_input(&cfg.ffprobe, &input)
            .with_context(|| format!("failed to open video {}", file.display()))?;
        return Ok((input, info));
    }
    if let Some(index) = cfg.camera_index {
        let input = InputSpec::Camera(CameraSpec {
            index,
            format: cfg.input_format,
        });
        let info = probe_input(&cfg.ffprobe, &input)
            .with_context(|| format!("failed to open camera {}", input.describe()))?;
        return Ok((input, info));
    }
    let (spec, info) = find_camera(
        &cfg.ffprobe,
        cfg.input_format,
        cfg.max_camera_index,
        cfg.settle,
    )
    .context("if you have a USB camera, connect it and rerun")?;
    Ok((InputSpec::Camera(spec), info))
}

pub fn watch_options(cfg: &WatchConfig, input: &InputSpec) -> WatchOptions {
    WatchOptions {
        output_dir: cfg.record.output_dir.clone(),
        camera: input.describe(),
        post_roll: cfg.record.post_roll,
        fps: cfg.record.fps,
        limit: CaptureLimit {
            max_frames: cfg.record.max_frames,
        },
        draw_boxes: cfg.record.draw_boxes,
    }
}

/// Run a full session until the input ends or `stop` is raised.
pub fn run_session(cfg: &WatchConfig, stop: Arc<AtomicBool>) -> anyhow::Result<SessionReport> {
    let mut detectors = build_detectors(&cfg.detect)?;
    let (input, info) = open_input(&cfg.capture)?;
    tracing::info!(
        input = %input.describe(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        "opened input"
    );
    let opts = SourceOptions {
        size: cfg.capture.size,
        framerate: cfg.capture.framerate,
        queue: cfg.capture.queue,
        ..SourceOptions::for_input(&input)
    };
    let mut source = FfmpegSource::spawn(&cfg.capture.ffmpeg, &input, info, opts)
        .context("failed to start capture")?;
    let mut factory =
        FfmpegRecorderFactory::new(&cfg.capture.ffmpeg).with_codec(cfg.record.codec.clone());
    let mut watcher = Watcher::new(watch_options(cfg, &input), SystemClock::new());
    let report = watcher.run(&mut source, &mut detectors, &mut factory, &stop)?;
    if source.dropped() > 0 {
        tracing::warn!(dropped = source.dropped(), "frames dropped while detection lagged");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn options_follow_record_config() {
        let mut cfg = WatchConfig::default();
        cfg.record.max_frames = Some(100);
        cfg.record.draw_boxes = true;
        let input = InputSpec::File(PathBuf::from("hall.mp4"));
        let opts = watch_options(&cfg, &input);
        assert_eq!(opts.camera, "hall.mp4");
        assert_eq!(opts.limit.max_frames, Some(100));
        assert_eq!(opts.fps, 20.0);
        assert!(opts.draw_boxes);
    }

    #[test]
    fn missing_face_cascade_fails_startup() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = DetectConfig {
            cascade_dir: tmp.path().to_path_buf(),
            ..DetectConfig::default()
        };
        let err = build_detectors(&cfg).err().expect("no cascades present");
        assert!(format!("{err:#}").contains("face cascade"));
    }
}
