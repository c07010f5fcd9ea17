use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {msg}")]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("training command is empty after rendering template {0:?}")]
    EmptyCommand(String),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Counts for one converted split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub split: String,
    /// Entries listed in the ground-truth file.
    pub images: usize,
    pub labels_written: usize,
    pub boxes: usize,
    /// Boxes dropped as invalid or too small.
    pub skipped_boxes: usize,
    /// Listed images missing on disk or unreadable.
    pub missing_images: usize,
    /// Images written with an empty label file.
    pub empty_images: usize,
}

impl ConversionSummary {
    pub fn merge(&mut self, other: &ConversionSummary) {
        self.images += other.images;
        self.labels_written += other.labels_written;
        self.boxes += other.boxes;
        self.skipped_boxes += other.skipped_boxes;
        self.missing_images += other.missing_images;
        self.empty_images += other.empty_images;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_missing: Option<usize>,
    pub max_skipped: Option<usize>,
    pub max_empty: Option<usize>,
    pub max_missing_ratio: Option<f32>,
    pub max_skipped_ratio: Option<f32>,
    pub max_empty_ratio: Option<f32>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok()?.parse().ok()
        }
        fn parse_ratio(key: &str) -> Option<f32> {
            std::env::var(key).ok()?.parse().ok()
        }
        ValidationThresholds {
            max_missing: parse_usize("FACE_DATASET_MAX_MISSING"),
            max_skipped: parse_usize("FACE_DATASET_MAX_SKIPPED"),
            max_empty: parse_usize("FACE_DATASET_MAX_EMPTY"),
            max_missing_ratio: parse_ratio("FACE_DATASET_MAX_MISSING_RATIO"),
            max_skipped_ratio: parse_ratio("FACE_DATASET_MAX_SKIPPED_RATIO"),
            max_empty_ratio: parse_ratio("FACE_DATASET_MAX_EMPTY_RATIO"),
        }
    }

    /// Overlay `other`'s set fields onto `self`.
    pub fn or(self, other: ValidationThresholds) -> Self {
        Self {
            max_missing: other.max_missing.or(self.max_missing),
            max_skipped: other.max_skipped.or(self.max_skipped),
            max_empty: other.max_empty.or(self.max_empty),
            max_missing_ratio: other.max_missing_ratio.or(self.max_missing_ratio),
            max_skipped_ratio: other.max_skipped_ratio.or(self.max_skipped_ratio),
            max_empty_ratio: other.max_empty_ratio.or(self.max_empty_ratio),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: ConversionSummary,
}
