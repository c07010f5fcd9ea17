//! Watch loop: detect on every frame, record while something is in view,
//! keep recording for a post-roll after the last detection.

pub mod clip;
pub mod clock;
pub mod error;
pub mod trigger;
pub mod watcher;

pub use clip::{ClipNamer, CLIP_EXTENSION, CLIP_TIME_FORMAT};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{WatchError, WatchResult};
pub use trigger::{RecordingTrigger, TriggerEvent, DEFAULT_POST_ROLL};
pub use watcher::{
    ClipSummary, FrameDetector, SessionReport, StopReason, WatchOptions, Watcher,
    DEFAULT_CLIP_FPS, SESSION_MANIFEST_FILE, SOURCE_POLL_INTERVAL,
};

pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::trigger::{RecordingTrigger, TriggerEvent};
    pub use crate::watcher::{FrameDetector, SessionReport, StopReason, WatchOptions, Watcher};
}
