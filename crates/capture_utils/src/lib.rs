//! Camera and video capture through ffmpeg, plus clip recording.
//!
//! Frames travel as raw `rgb24` over ffmpeg's stdout/stdin pipes, so no
//! native codec bindings are linked.

pub mod camera;
pub mod command;
pub mod error;
pub mod probe;
pub mod recorder;
pub mod sidecar;
pub mod source;

pub use camera::{find_camera, find_camera_with, CameraSpec, InputFormat, InputSpec};
pub use command::FfmpegCommand;
pub use error::{CaptureError, CaptureResult};
pub use probe::{parse_probe_output, probe_input, StreamInfo};
pub use recorder::{FfmpegRecorder, FfmpegRecorderFactory, DEFAULT_CODEC};
pub use sidecar::JsonClipSidecar;
pub use source::{FfmpegSource, SourceOptions};
