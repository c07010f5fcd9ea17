use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Clips are named after the local time recording started.
pub const CLIP_TIME_FORMAT: &str = "%d-%m-%Y-%H-%M-%S";
pub const CLIP_EXTENSION: &str = "mp4";

/// Picks clip paths inside an output directory. A second clip started in
/// the same second gets a `-1`, `-2`, ... suffix.
#[derive(Debug, Clone)]
pub struct ClipNamer {
    dir: PathBuf,
    extension: String,
    issued: HashSet<PathBuf>,
}

impl ClipNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: CLIP_EXTENSION.to_string(),
            issued: HashSet::new(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next(&mut self, at: DateTime<Local>) -> PathBuf {
        let stem = at.format(CLIP_TIME_FORMAT).to_string();
        let mut candidate = self.dir.join(format!("{stem}.{}", self.extension));
        let mut n = 1u32;
        while self.issued.contains(&candidate) || candidate.exists() {
            candidate = self.dir.join(format!("{stem}-{n}.{}", self.extension));
            n += 1;
        }
        self.issued.insert(candidate.clone());
        candidate
    }
}
