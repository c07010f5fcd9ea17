use serde::{Deserialize, Serialize};

/// Optional bound on how many frames a session pulls from its source.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureLimit {
    pub max_frames: Option<u64>,
}

impl CaptureLimit {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn frames(max_frames: u64) -> Self {
        Self {
            max_frames: Some(max_frames),
        }
    }

    /// True once `seen` frames reach the limit.
    pub fn reached(&self, seen: u64) -> bool {
        self.max_frames.is_some_and(|max| seen >= max)
    }
}
