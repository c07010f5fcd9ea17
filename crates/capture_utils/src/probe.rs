use crate::camera::InputSpec;
use crate::command::FfmpegCommand;
use crate::error::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Used when ffprobe reports no usable frame rate (common for webcams).
pub const FALLBACK_FPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

// Some streams omit most fields, so everything is optional.
#[derive(Debug, Deserialize)]
struct RawProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProbeOutput {
    #[serde(default)]
    streams: Vec<RawProbeStream>,
}

/// Parse `"30000/1001"` or `"25"`; `None` for `"0/0"` and garbage.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Extract the first video stream from `ffprobe -show_streams -of json` output.
pub fn parse_probe_output(input: &str, json: &str) -> CaptureResult<StreamInfo> {
    let raw: RawProbeOutput = serde_json::from_str(json)?;
    let stream = raw
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| CaptureError::NoVideoStream(input.to_string()))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(CaptureError::NoVideoStream(input.to_string())),
    };
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(FALLBACK_FPS);
    Ok(StreamInfo { width, height, fps })
}

pub fn probe_input(ffprobe: &Path, input: &InputSpec) -> CaptureResult<StreamInfo> {
    let cmd = FfmpegCommand::new(ffprobe)
        .args(["-v", "error", "-show_streams", "-of", "json"])
        .args(input.input_args());
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(CaptureError::Probe {
            input: input.describe(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&input.describe(), &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_video_stream() {
        let json = r#"{"streams":[
            {"index":0,"codec_type":"audio"},
            {"index":1,"codec_type":"video","width":640,"height":480,"avg_frame_rate":"30000/1001"}
        ]}"#;
        let info = parse_probe_output("cam", json).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn zero_rate_falls_back() {
        let json = r#"{"streams":[{"codec_type":"video","width":320,"height":240,
            "avg_frame_rate":"0/0","r_frame_rate":"15/1"}]}"#;
        assert_eq!(parse_probe_output("cam", json).unwrap().fps, 15.0);
        let json = r#"{"streams":[{"codec_type":"video","width":320,"height":240}]}"#;
        assert_eq!(parse_probe_output("cam", json).unwrap().fps, FALLBACK_FPS);
    }

    #[test]
    fn missing_video_stream_is_an_error() {
        let err = parse_probe_output("mic", r#"{"streams":[{"codec_type":"audio"}]}"#)
            .unwrap_err();
        assert!(matches!(err, CaptureError::NoVideoStream(ref s) if s == "mic"));
        assert!(matches!(
            parse_probe_output("x", "{}").unwrap_err(),
            CaptureError::NoVideoStream(_)
        ));
    }
}
