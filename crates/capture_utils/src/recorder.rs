use crate::command::FfmpegCommand;
use crate::error::{CaptureError, CaptureResult};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::thread::{self, JoinHandle};
use vision_core::interfaces::{Frame, RecordedClip, Recorder, RecorderFactory};

/// MPEG-4 Part 2, readable by every common player.
pub const DEFAULT_CODEC: &str = "mpeg4";

/// Trailing stderr lines kept for the exit error.
const STDERR_TAIL_LINES: usize = 20;

/// Read ffmpeg's stderr for the life of the process, keeping the last lines.
fn drain_stderr<R: Read + Send + 'static>(stderr: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        for line in BufReader::new(stderr).split(b'\n') {
            let Ok(line) = line else { break };
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(String::from_utf8_lossy(&line).trim_end().to_string());
        }
        Vec::from(tail).join("\n")
    })
}

/// Encodes raw frames into a clip by piping them into ffmpeg's stdin.
pub struct FfmpegRecorder {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
    path: PathBuf,
    size: (u32, u32),
    fps: f64,
    frames: u64,
}

impl FfmpegRecorder {
    pub fn command(
        ffmpeg: &Path,
        path: &Path,
        size: (u32, u32),
        fps: f64,
        codec: &str,
    ) -> FfmpegCommand {
        FfmpegCommand::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", size.0, size.1))
            .arg("-r")
            .arg(fps.to_string())
            .args(["-i", "-", "-c:v", codec, "-pix_fmt", "yuv420p"])
            .arg(path.display().to_string())
    }

    pub fn spawn(
        ffmpeg: &Path,
        path: &Path,
        size: (u32, u32),
        fps: f64,
        codec: &str,
    ) -> CaptureResult<Self> {
        let mut child = Self::command(ffmpeg, path, size, fps, codec).spawn(
            Stdio::piped(),
            Stdio::null(),
            Stdio::piped(),
        )?;
        let stdin = child.stdin.take().ok_or_else(|| {
            CaptureError::Io(std::io::Error::other("ffmpeg stdin was not captured"))
        })?;
        let stderr = child.stderr.take().map(drain_stderr);
        tracing::info!(path = %path.display(), width = size.0, height = size.1, fps, "clip opened");
        Ok(Self {
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
            stderr,
            path: path.to_path_buf(),
            size,
            fps,
            frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_frame(&mut self, frame: &Frame) -> CaptureResult<()> {
        if frame.size != self.size {
            return Err(CaptureError::SizeMismatch {
                expected: self.size,
                got: frame.size,
            });
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CaptureError::Io(std::io::Error::other("clip already finished")))?;
        stdin.write_all(&frame.rgb)?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> CaptureResult<RecordedClip> {
        if let Some(mut stdin) = self.stdin.take() {
            // A flush failure usually means ffmpeg died; its status says why.
            if let Err(err) = stdin.flush() {
                tracing::warn!(%err, "flushing clip data failed");
            }
        }
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CaptureError::Io(std::io::Error::other("clip already finished")))?;
        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(CaptureError::Exit {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        tracing::info!(path = %self.path.display(), frames = self.frames, "clip closed");
        Ok(RecordedClip {
            path: self.path.clone(),
            frames: self.frames,
            size: self.size,
            fps: self.fps,
        })
    }
}

impl Recorder for FfmpegRecorder {
    fn record(&mut self, frame: &Frame) -> std::io::Result<()> {
        self.write_frame(frame).map_err(Into::into)
    }

    fn finish(&mut self) -> std::io::Result<RecordedClip> {
        self.close().map_err(Into::into)
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if self.child.is_some() {
            tracing::warn!(path = %self.path.display(), "clip dropped without finish");
            let _ = self.close();
        }
    }
}

/// Opens one `FfmpegRecorder` per clip.
#[derive(Debug, Clone)]
pub struct FfmpegRecorderFactory {
    pub ffmpeg: PathBuf,
    pub codec: String,
}

impl FfmpegRecorderFactory {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            codec: DEFAULT_CODEC.to_string(),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn open(
        &mut self,
        path: &Path,
        size: (u32, u32),
        fps: f64,
    ) -> std::io::Result<Box<dyn Recorder + Send>> {
        let recorder = FfmpegRecorder::spawn(&self.ffmpeg, path, size, fps, &self.codec)?;
        Ok(Box::new(recorder))
    }
}
