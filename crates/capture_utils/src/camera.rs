use crate::error::{CaptureError, CaptureResult};
use crate::probe::{probe_input, StreamInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ffmpeg demuxer used to open a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    V4l2,
    AvFoundation,
}

impl InputFormat {
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            InputFormat::AvFoundation
        } else {
            InputFormat::V4l2
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::V4l2 => "v4l2",
            InputFormat::AvFoundation => "avfoundation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSpec {
    pub index: u32,
    pub format: InputFormat,
}

impl CameraSpec {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            format: InputFormat::platform_default(),
        }
    }

    /// Device name as ffmpeg's `-i` expects it for this format.
    pub fn device(&self) -> String {
        match self.format {
            InputFormat::V4l2 => format!("/dev/video{}", self.index),
            InputFormat::AvFoundation => format!("{}", self.index),
        }
    }
}

/// Where frames come from: a live device or a video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Camera(CameraSpec),
    File(PathBuf),
}

impl InputSpec {
    /// Demuxer and input arguments, e.g. `-f v4l2 -i /dev/video0`.
    pub fn input_args(&self) -> Vec<String> {
        match self {
            InputSpec::Camera(cam) => vec![
                "-f".into(),
                cam.format.as_str().into(),
                "-i".into(),
                cam.device(),
            ],
            InputSpec::File(path) => vec!["-i".into(), path.display().to_string()],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSpec::Camera(cam) => format!("{} {}", cam.format.as_str(), cam.device()),
            InputSpec::File(path) => path.display().to_string(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, InputSpec::Camera(_))
    }
}

/// Probe camera indices `0..=max_index` with ffprobe and return the first
/// that yields a video stream.
pub fn find_camera(
    ffprobe: &Path,
    format: InputFormat,
    max_index: u32,
    settle: Duration,
) -> CaptureResult<(CameraSpec, StreamInfo)> {
    find_camera_with(max_index, settle, |index| {
        let spec = CameraSpec { index, format };
        probe_input(ffprobe, &InputSpec::Camera(spec)).map(|info| (spec, info))
    })
}

/// Index scan with a caller-supplied probe. Sleeps `settle` before each
/// attempt so a device released by a previous probe can come back.
pub fn find_camera_with<T, F>(max_index: u32, settle: Duration, mut probe: F) -> CaptureResult<T>
where
    F: FnMut(u32) -> CaptureResult<T>,
{
    for index in 0..=max_index {
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        match probe(index) {
            Ok(found) => {
                tracing::info!(index, "camera found");
                return Ok(found);
            }
            Err(err) => tracing::debug!(index, %err, "camera index not usable"),
        }
    }
    Err(CaptureError::NoCamera { max_index })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_names_follow_platform_format() {
        let v4l = CameraSpec {
            index: 2,
            format: InputFormat::V4l2,
        };
        assert_eq!(v4l.device(), "/dev/video2");
        let avf = CameraSpec {
            index: 1,
            format: InputFormat::AvFoundation,
        };
        assert_eq!(avf.device(), "1");
        assert_eq!(
            InputSpec::Camera(avf).input_args(),
            vec!["-f", "avfoundation", "-i", "1"]
        );
    }

    #[test]
    fn file_input_has_no_demuxer() {
        let input = InputSpec::File(PathBuf::from("clip.mp4"));
        assert_eq!(input.input_args(), vec!["-i", "clip.mp4"]);
        assert!(!input.is_live());
    }

    #[test]
    fn scan_returns_first_working_index() {
        let mut tried = Vec::new();
        let found = find_camera_with(5, Duration::ZERO, |i| {
            tried.push(i);
            if i == 2 {
                Ok(i)
            } else {
                Err(CaptureError::NoVideoStream(format!("/dev/video{i}")))
            }
        })
        .unwrap();
        assert_eq!(found, 2);
        assert_eq!(tried, vec![0, 1, 2]);
    }

    #[test]
    fn scan_exhausts_range_and_reports_no_camera() {
        let mut calls = 0;
        let err = find_camera_with::<(), _>(5, Duration::ZERO, |i| {
            calls += 1;
            Err(CaptureError::NoVideoStream(i.to_string()))
        })
        .unwrap_err();
        assert_eq!(calls, 6);
        assert!(matches!(err, CaptureError::NoCamera { max_index: 5 }));
    }
}
