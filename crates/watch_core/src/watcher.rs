use crate::clip::ClipNamer;
use crate::clock::Clock;
use crate::error::{WatchError, WatchResult};
use crate::trigger::{RecordingTrigger, TriggerEvent, DEFAULT_POST_ROLL};
use capture_utils::JsonClipSidecar;
use chrono::{DateTime, Local};
use data_contracts::capture::{ClipManifest, ClipManifestSchemaVersion};
use data_contracts::manifest::{SessionManifest, SessionManifestSchemaVersion};
use inference::DetectorSet;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use vision_core::prelude::{
    draw_detections, CaptureLimit, DetectionKind, DetectionResult, Detector, Frame, FramePoll,
    FrameSource, Recorder, RecorderFactory,
};

pub const SESSION_MANIFEST_FILE: &str = "session_manifest.json";
/// Clip frame rate used by the original camera loop.
pub const DEFAULT_CLIP_FPS: f64 = 20.0;
/// Longest wait for a frame before the stop flag is checked again.
pub const SOURCE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs every active detector on a frame.
pub trait FrameDetector {
    fn kinds(&self) -> Vec<DetectionKind>;
    fn detect_frame(&mut self, frame: &Frame) -> DetectionResult;
}

impl FrameDetector for DetectorSet {
    fn kinds(&self) -> Vec<DetectionKind> {
        DetectorSet::kinds(self)
    }

    fn detect_frame(&mut self, frame: &Frame) -> DetectionResult {
        self.detect(frame)
    }
}

impl FrameDetector for Vec<Box<dyn Detector + Send>> {
    fn kinds(&self) -> Vec<DetectionKind> {
        self.iter().map(|d| d.kind()).collect()
    }

    fn detect_frame(&mut self, frame: &Frame) -> DetectionResult {
        let mut result = DetectionResult::empty(frame.id);
        for det in self.iter_mut() {
            result.merge(det.detect(frame));
        }
        result
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub output_dir: PathBuf,
    /// Input description stored in the session manifest.
    pub camera: String,
    pub post_roll: Duration,
    pub fps: f64,
    pub limit: CaptureLimit,
    /// Draw detection boxes into recorded frames.
    pub draw_boxes: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            camera: String::new(),
            post_roll: DEFAULT_POST_ROLL,
            fps: DEFAULT_CLIP_FPS,
            limit: CaptureLimit::unbounded(),
            draw_boxes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    SourceEnded,
    StopRequested,
    FrameLimit,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipSummary {
    pub path: PathBuf,
    pub sidecar: Option<PathBuf>,
    pub manifest: ClipManifest,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub frames_seen: u64,
    pub frames_written: u64,
    pub detection_frames: u64,
    pub clips: Vec<ClipSummary>,
    pub stop_reason: StopReason,
}

/// A clip being written.
struct ActiveClip {
    recorder: Box<dyn Recorder + Send>,
    path: PathBuf,
    started_at: DateTime<Local>,
    size: (u32, u32),
    written: u64,
    detection_frames: u64,
    peak_faces: usize,
    peak_bodies: usize,
}

impl ActiveClip {
    fn write(&mut self, frame: &Frame, result: &DetectionResult) -> WatchResult<()> {
        self.recorder
            .record(frame)
            .map_err(|source| WatchError::WriteFrame {
                frame_id: frame.id,
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        if result.is_positive() {
            self.detection_frames += 1;
        }
        self.peak_faces = self.peak_faces.max(result.count(DetectionKind::Face));
        self.peak_bodies = self.peak_bodies.max(result.count(DetectionKind::Body));
        Ok(())
    }
}

/// Drives source -> detectors -> trigger -> recorder.
pub struct Watcher<C: Clock> {
    options: WatchOptions,
    clock: C,
    trigger: RecordingTrigger,
    namer: ClipNamer,
    sidecar: JsonClipSidecar,
}

impl<C: Clock> Watcher<C> {
    pub fn new(options: WatchOptions, clock: C) -> Self {
        let trigger = RecordingTrigger::new(options.post_roll);
        let namer = ClipNamer::new(&options.output_dir);
        Self {
            options,
            clock,
            trigger,
            namer,
            sidecar: JsonClipSidecar,
        }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    fn session_manifest(&self, kinds: &[DetectionKind]) -> SessionManifest {
        SessionManifest {
            schema_version: SessionManifestSchemaVersion::V1,
            camera: self.options.camera.clone(),
            output_dir: self.options.output_dir.clone(),
            started_at: self.clock.wall(),
            post_roll_secs: self.options.post_roll.as_secs_f64(),
            fps: self.options.fps,
            detectors: kinds.iter().map(|k| k.as_str().to_string()).collect(),
            max_frames: self.options.limit.max_frames,
        }
    }

    fn write_session_manifest(&self, manifest: &SessionManifest) -> WatchResult<PathBuf> {
        let path = self.options.output_dir.join(SESSION_MANIFEST_FILE);
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&path)?;
            serde_json::to_writer_pretty(&mut file, manifest)?;
            file.write_all(b"\n")
        };
        write().map_err(|source| WatchError::SessionManifest {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Run until the source ends, `stop` is set, or the frame limit is hit.
    /// A clip still open at exit is always finished.
    pub fn run<S, D, F>(
        &mut self,
        source: &mut S,
        detectors: &mut D,
        factory: &mut F,
        stop: &AtomicBool,
    ) -> WatchResult<SessionReport>
    where
        S: FrameSource + ?Sized,
        D: FrameDetector + ?Sized,
        F: RecorderFactory + ?Sized,
    {
        let out_dir = self.options.output_dir.clone();
        fs::create_dir_all(&out_dir).map_err(|source| WatchError::OutputDir {
            path: out_dir.clone(),
            source,
        })?;
        let manifest = self.session_manifest(&detectors.kinds());
        manifest.validate()?;
        let manifest_path = self.write_session_manifest(&manifest)?;
        tracing::info!(
            output_dir = %out_dir.display(),
            manifest = %manifest_path.display(),
            detectors = ?manifest.detectors,
            "watch session started"
        );

        let mut report = SessionReport {
            frames_seen: 0,
            frames_written: 0,
            detection_frames: 0,
            clips: Vec::new(),
            stop_reason: StopReason::SourceEnded,
        };
        let mut active: Option<ActiveClip> = None;
        let outcome = self.pump(source, detectors, factory, stop, &mut active, &mut report);
        if let Some(clip) = active.take() {
            let finished = self.finish_clip(clip, &mut report);
            if outcome.is_ok() {
                finished?;
            } else if let Err(err) = finished {
                tracing::error!(%err, "failed to finish clip after error");
            }
        }
        report.stop_reason = outcome?;
        tracing::info!(
            frames_seen = report.frames_seen,
            frames_written = report.frames_written,
            clips = report.clips.len(),
            reason = ?report.stop_reason,
            "watch session ended"
        );
        Ok(report)
    }

    fn pump<S, D, F>(
        &mut self,
        source: &mut S,
        detectors: &mut D,
        factory: &mut F,
        stop: &AtomicBool,
        active: &mut Option<ActiveClip>,
        report: &mut SessionReport,
    ) -> WatchResult<StopReason>
    where
        S: FrameSource + ?Sized,
        D: FrameDetector + ?Sized,
        F: RecorderFactory + ?Sized,
    {
        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(StopReason::StopRequested);
            }
            if self.options.limit.reached(report.frames_seen) {
                return Ok(StopReason::FrameLimit);
            }
            let mut frame = match source.poll_frame(SOURCE_POLL_INTERVAL) {
                FramePoll::Ready(frame) => frame,
                FramePoll::Pending => {
                    tracing::trace!("no frame yet");
                    continue;
                }
                FramePoll::Ended => {
                    tracing::info!("frame source ended");
                    return Ok(StopReason::SourceEnded);
                }
            };
            report.frames_seen += 1;

            let result = detectors.detect_frame(&frame);
            let detected = result.is_positive();
            if detected {
                report.detection_frames += 1;
            }
            let event = self.trigger.advance(detected, self.clock.elapsed());
            match event {
                TriggerEvent::Start => {
                    *active = Some(self.open_clip(factory, frame.size)?);
                }
                TriggerEvent::CooldownStarted => {
                    tracing::debug!(frame = frame.id, "detection lost; post-roll started");
                }
                TriggerEvent::Stop => {
                    if let Some(clip) = active.take() {
                        self.finish_clip(clip, report)?;
                    }
                }
                TriggerEvent::Idle | TriggerEvent::Recording | TriggerEvent::Cooldown => {}
            }

            if event.writes_frame() {
                if let Some(clip) = active.as_mut() {
                    if self.options.draw_boxes {
                        draw_detections(&mut frame, &result.detections);
                    }
                    clip.write(&frame, &result)?;
                    report.frames_written += 1;
                }
            }
        }
    }

    fn open_clip<F>(&mut self, factory: &mut F, size: (u32, u32)) -> WatchResult<ActiveClip>
    where
        F: RecorderFactory + ?Sized,
    {
        let started_at = self.clock.wall();
        let path = self.namer.next(started_at);
        let recorder = factory
            .open(&path, size, self.options.fps)
            .map_err(|source| WatchError::OpenClip {
                path: path.clone(),
                source,
            })?;
        tracing::info!(clip = %path.display(), "started recording");
        Ok(ActiveClip {
            recorder,
            path,
            started_at,
            size,
            written: 0,
            detection_frames: 0,
            peak_faces: 0,
            peak_bodies: 0,
        })
    }

    fn finish_clip(&self, mut clip: ActiveClip, report: &mut SessionReport) -> WatchResult<()> {
        let recorded = clip
            .recorder
            .finish()
            .map_err(|source| WatchError::FinishClip {
                path: clip.path.clone(),
                source,
            })?;
        let manifest = ClipManifest {
            schema_version: ClipManifestSchemaVersion::V1,
            clip: clip_file_name(&clip.path),
            started_at: clip.started_at,
            ended_at: self.clock.wall(),
            frames: recorded.frames,
            size: clip.size,
            fps: recorded.fps,
            peak_faces: clip.peak_faces,
            peak_bodies: clip.peak_bodies,
            detection_frames: clip.detection_frames.min(recorded.frames),
        };
        if recorded.frames != clip.written {
            tracing::warn!(
                clip = %clip.path.display(),
                written = clip.written,
                reported = recorded.frames,
                "recorder frame count differs"
            );
        }
        let sidecar = match self.sidecar.write(&clip.path, &manifest) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(clip = %clip.path.display(), %err, "clip sidecar not written");
                None
            }
        };
        tracing::info!(
            clip = %clip.path.display(),
            frames = recorded.frames,
            "stop recording"
        );
        report.clips.push(ClipSummary {
            path: recorded.path,
            sidecar,
            manifest,
        });
        Ok(())
    }
}

fn clip_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
