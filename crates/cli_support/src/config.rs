use std::path::{Path, PathBuf};
use std::time::Duration;

use capture_utils::{InputFormat, DEFAULT_CODEC};
use face_dataset::{TrainSettings, ValidationThresholds};
use inference::DetectorThresholds;
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "watchpost.toml";
const CONFIG_ENV: &str = "WATCHPOST_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub input_format: InputFormat,
    /// Fixed camera index; scanned when unset.
    pub camera_index: Option<u32>,
    /// Read this file instead of a camera.
    pub video_file: Option<PathBuf>,
    pub max_camera_index: u32,
    pub settle: Duration,
    pub size: Option<(u32, u32)>,
    pub framerate: Option<f64>,
    pub queue: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            input_format: InputFormat::platform_default(),
            camera_index: None,
            video_file: None,
            max_camera_index: 5,
            settle: Duration::from_millis(500),
            size: None,
            framerate: None,
            queue: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectConfig {
    pub cascade_dir: PathBuf,
    pub face: DetectorThresholds,
    pub body: DetectorThresholds,
    pub body_enabled: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            cascade_dir: PathBuf::from("cascades"),
            face: DetectorThresholds::face(),
            body: DetectorThresholds::body(),
            body_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordConfig {
    pub output_dir: PathBuf,
    pub post_roll: Duration,
    pub fps: f64,
    pub codec: String,
    pub draw_boxes: bool,
    pub max_frames: Option<u64>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            post_roll: Duration::from_secs(5),
            fps: 20.0,
            codec: DEFAULT_CODEC.to_string(),
            draw_boxes: false,
            max_frames: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSettings {
    pub wider_root: PathBuf,
    pub out_root: PathBuf,
    pub splits: Vec<String>,
    pub min_box_px: u32,
    pub copy_images: bool,
    pub thresholds: ValidationThresholds,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            wider_root: PathBuf::from("datasets/wider_face"),
            out_root: PathBuf::from("datasets/faces_yolo"),
            splits: vec!["train".to_string(), "val".to_string()],
            min_box_px: 2,
            copy_images: true,
            thresholds: ValidationThresholds::default(),
        }
    }
}

/// Settings shared by the watcher and the dataset tools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchConfig {
    pub capture: CaptureConfig,
    pub detect: DetectConfig,
    pub record: RecordConfig,
    pub dataset: DatasetSettings,
    pub training: TrainSettings,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WatchConfigFile {
    capture: Option<CaptureSection>,
    detect: Option<DetectSection>,
    record: Option<RecordSection>,
    dataset: Option<DatasetSection>,
    training: Option<TrainingSection>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureSection {
    ffmpeg: Option<String>,
    ffprobe: Option<String>,
    input_format: Option<InputFormat>,
    camera_index: Option<u32>,
    video_file: Option<String>,
    max_camera_index: Option<u32>,
    settle_ms: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    framerate: Option<f64>,
    queue: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdSection {
    scale_factor: Option<f64>,
    min_neighbors: Option<u32>,
    min_size: Option<[u32; 2]>,
}

impl ThresholdSection {
    fn apply(self, base: DetectorThresholds) -> DetectorThresholds {
        DetectorThresholds {
            scale_factor: self.scale_factor.unwrap_or(base.scale_factor),
            min_neighbors: self.min_neighbors.unwrap_or(base.min_neighbors),
            min_size: self.min_size.map(|[w, h]| (w, h)).unwrap_or(base.min_size),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct DetectSection {
    cascade_dir: Option<String>,
    body_enabled: Option<bool>,
    face: Option<ThresholdSection>,
    body: Option<ThresholdSection>,
}

#[derive(Debug, Deserialize, Default)]
struct RecordSection {
    output_dir: Option<String>,
    post_roll_secs: Option<f64>,
    fps: Option<f64>,
    codec: Option<String>,
    draw_boxes: Option<bool>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DatasetSection {
    wider_root: Option<String>,
    out_root: Option<String>,
    splits: Option<Vec<String>>,
    min_box_px: Option<u32>,
    copy_images: Option<bool>,
    thresholds: Option<ValidationThresholds>,
}

#[derive(Debug, Deserialize, Default)]
struct TrainingSection {
    template: Option<String>,
    model: Option<String>,
    data: Option<String>,
    imgsz: Option<u32>,
    epochs: Option<u32>,
    batch: Option<u32>,
    extra_args: Option<String>,
}

impl WatchConfig {
    /// `$WATCHPOST_CONFIG` if set, else `./watchpost.toml`, else defaults.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME));
        Self::load_from(&path)
    }

    /// Like [`WatchConfig::load`] but with an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let cfg = Self::from_path(path).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "config unreadable; using defaults");
                return None;
            }
        };
        Self::from_toml(&raw)
            .map_err(|err| {
                tracing::warn!(path = %path.display(), %err, "config invalid; using defaults");
            })
            .ok()
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let file: WatchConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let defaults = WatchConfig::default();

        let c = file.capture.unwrap_or_default();
        let size = match (c.width, c.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => defaults.capture.size,
        };
        let capture = CaptureConfig {
            ffmpeg: c.ffmpeg.map(|v| expand_path(&v)).unwrap_or(defaults.capture.ffmpeg),
            ffprobe: c
                .ffprobe
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.capture.ffprobe),
            input_format: c.input_format.unwrap_or(defaults.capture.input_format),
            camera_index: c.camera_index,
            video_file: c.video_file.map(|v| expand_path(&v)),
            max_camera_index: c
                .max_camera_index
                .unwrap_or(defaults.capture.max_camera_index),
            settle: c
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.capture.settle),
            size,
            framerate: c.framerate,
            queue: c.queue.unwrap_or(defaults.capture.queue),
        };

        let d = file.detect.unwrap_or_default();
        let detect = DetectConfig {
            cascade_dir: d
                .cascade_dir
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.detect.cascade_dir),
            face: d.face.unwrap_or_default().apply(defaults.detect.face),
            body: d.body.unwrap_or_default().apply(defaults.detect.body),
            body_enabled: d.body_enabled.unwrap_or(defaults.detect.body_enabled),
        };

        let r = file.record.unwrap_or_default();
        let record = RecordConfig {
            output_dir: r
                .output_dir
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.record.output_dir),
            post_roll: match r.post_roll_secs.map(Duration::try_from_secs_f64) {
                Some(Ok(post_roll)) => post_roll,
                Some(Err(err)) => {
                    tracing::warn!(
                        post_roll_secs = ?r.post_roll_secs,
                        %err,
                        "config: record.post_roll_secs is out of range; using default"
                    );
                    defaults.record.post_roll
                }
                None => defaults.record.post_roll,
            },
            fps: r.fps.unwrap_or(defaults.record.fps),
            codec: r
                .codec
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(defaults.record.codec),
            draw_boxes: r.draw_boxes.unwrap_or(defaults.record.draw_boxes),
            max_frames: r.max_frames,
        };

        let ds = file.dataset.unwrap_or_default();
        let dataset = DatasetSettings {
            wider_root: ds
                .wider_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.dataset.wider_root),
            out_root: ds
                .out_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.dataset.out_root),
            splits: ds.splits.unwrap_or(defaults.dataset.splits),
            min_box_px: ds.min_box_px.unwrap_or(defaults.dataset.min_box_px),
            copy_images: ds.copy_images.unwrap_or(defaults.dataset.copy_images),
            thresholds: ds.thresholds.unwrap_or_default(),
        };

        let t = file.training.unwrap_or_default();
        let training = TrainSettings {
            template: t.template.unwrap_or(defaults.training.template),
            model: t.model.unwrap_or(defaults.training.model),
            data: t.data.map(|v| expand_path(&v)).unwrap_or(defaults.training.data),
            imgsz: t.imgsz.unwrap_or(defaults.training.imgsz),
            epochs: t.epochs.unwrap_or(defaults.training.epochs),
            batch: t.batch.unwrap_or(defaults.training.batch),
            extra_args: t.extra_args.unwrap_or(defaults.training.extra_args),
        };

        WatchConfig {
            capture,
            detect,
            record,
            dataset,
            training,
        }
    }

    pub fn warn_if_invalid(&self) {
        if self.capture.ffmpeg.as_os_str().is_empty() {
            tracing::warn!("config: capture.ffmpeg is empty; capture and recording will fail");
        }
        if self.capture.queue == 0 {
            tracing::warn!("config: capture.queue is 0; one frame will be buffered");
        }
        for (name, t) in [("face", &self.detect.face), ("body", &self.detect.body)] {
            if t.scale_factor <= 1.0 {
                tracing::warn!(
                    detector = name,
                    scale_factor = t.scale_factor,
                    "config: scale_factor must be > 1.0; detector will fail to load"
                );
            }
        }
        if !(self.record.fps.is_finite() && self.record.fps > 0.0) {
            tracing::warn!(fps = self.record.fps, "config: record.fps must be positive");
        }
        if self.record.max_frames == Some(0) {
            tracing::warn!("config: record.max_frames = 0 is rejected when the session starts");
        }
        if self.training.template.trim().is_empty() {
            tracing::warn!("config: training.template is empty; train_cmd will fail");
        }
        if self.dataset.splits.is_empty() {
            tracing::warn!("config: dataset.splits is empty; nothing will be converted");
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = &rest[start + 2..start + 2 + end];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&format!("${{{key}}}")),
        }
        rest = &rest[start + 3 + end..];
    }
    out.push_str(rest);
    out
}
