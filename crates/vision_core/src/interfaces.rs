use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// BT.601 luma weights in 14-bit fixed point.
const R2Y: u32 = 4899;
const G2Y: u32 = 9617;
const B2Y: u32 = 1868;
const Y_SHIFT: u32 = 14;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame buffer has {actual} bytes, expected {expected} for {width}x{height} RGB8")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("frame has zero-sized dimension {0}x{1}")]
    Empty(u32, u32),
}

/// A frame of packed RGB8 image data and associated metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: u64,
    /// Seconds since the source was opened.
    pub timestamp: f64,
    /// Row-major RGB8 pixels, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
    /// Image dimensions (width, height).
    pub size: (u32, u32),
}

impl Frame {
    pub fn new(id: u64, timestamp: f64, rgb: Vec<u8>, size: (u32, u32)) -> Result<Self, FrameError> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(FrameError::Empty(width, height));
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: rgb.len(),
            });
        }
        Ok(Self {
            id,
            timestamp,
            rgb,
            size,
        })
    }

    pub fn from_rgb_image(id: u64, timestamp: f64, img: RgbImage) -> Self {
        let size = img.dimensions();
        Self {
            id,
            timestamp,
            rgb: img.into_raw(),
            size,
        }
    }

    pub fn width(&self) -> u32 {
        self.size.0
    }

    pub fn height(&self) -> u32 {
        self.size.1
    }

    /// Copy the pixels into an `RgbImage`. Returns `None` if the buffer is short.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.size.0, self.size.1, self.rgb.clone())
    }

    /// 8-bit luma plane, rounded the same way for every pixel.
    pub fn to_gray(&self) -> GrayImage {
        let (w, h) = self.size;
        let mut gray = Vec::with_capacity(w as usize * h as usize);
        for px in self.rgb.chunks_exact(3) {
            let y = (px[0] as u32 * R2Y + px[1] as u32 * G2Y + px[2] as u32 * B2Y
                + (1 << (Y_SHIFT - 1)))
                >> Y_SHIFT;
            gray.push(y.min(255) as u8);
        }
        gray.resize(w as usize * h as usize, 0);
        GrayImage::from_raw(w, h, gray).unwrap_or_else(|| GrayImage::new(w, h))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    Face,
    Body,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Face => "face",
            DetectionKind::Body => "body",
        }
    }
}

/// One detected object in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    /// \[x0, y0, x1, y1\] with exclusive max edges.
    pub bbox_px: [u32; 4],
    /// Raw candidate windows merged into this detection.
    pub neighbors: u32,
}

impl Detection {
    pub fn width(&self) -> u32 {
        self.bbox_px[2].saturating_sub(self.bbox_px[0])
    }

    pub fn height(&self) -> u32 {
        self.bbox_px[3].saturating_sub(self.bbox_px[1])
    }
}

/// Result of running one or more detectors on a frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub frame_id: u64,
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn empty(frame_id: u64) -> Self {
        Self {
            frame_id,
            detections: Vec::new(),
        }
    }

    pub fn is_positive(&self) -> bool {
        !self.detections.is_empty()
    }

    pub fn count(&self, kind: DetectionKind) -> usize {
        self.detections.iter().filter(|d| d.kind == kind).count()
    }

    pub fn merge(&mut self, other: DetectionResult) {
        self.detections.extend(other.detections);
    }
}

/// Summary returned when a recorder finishes a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedClip {
    pub path: PathBuf,
    pub frames: u64,
    pub size: (u32, u32),
    pub fps: f64,
}

/// Result of waiting a bounded time for the next frame.
#[derive(Debug)]
pub enum FramePoll {
    Ready(Frame),
    /// Nothing arrived within the timeout; the source is still open.
    Pending,
    Ended,
}

/// Pulls frames from some source (camera, video file, test generator).
pub trait FrameSource {
    /// `None` means the source is exhausted or disconnected.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Wait at most `timeout` for a frame. Sources that cannot time out
    /// block in [`FrameSource::next_frame`].
    fn poll_frame(&mut self, timeout: Duration) -> FramePoll {
        let _ = timeout;
        match self.next_frame() {
            Some(frame) => FramePoll::Ready(frame),
            None => FramePoll::Ended,
        }
    }
}

/// Runs inference on a frame.
pub trait Detector {
    fn kind(&self) -> DetectionKind;
    fn detect(&mut self, frame: &Frame) -> DetectionResult;
}

/// Persists frames of a single clip to a sink (video file, memory, etc).
pub trait Recorder {
    fn record(&mut self, frame: &Frame) -> std::io::Result<()>;
    /// Flush and close the clip. Called exactly once.
    fn finish(&mut self) -> std::io::Result<RecordedClip>;
}

/// Opens a new `Recorder` for each clip.
pub trait RecorderFactory {
    fn open(
        &mut self,
        path: &Path,
        size: (u32, u32),
        fps: f64,
    ) -> std::io::Result<Box<dyn Recorder + Send>>;
}
