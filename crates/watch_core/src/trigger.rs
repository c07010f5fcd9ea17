use std::time::Duration;

/// Recording continues this long after the last detection.
pub const DEFAULT_POST_ROLL: Duration = Duration::from_secs(5);

/// Outcome of feeding one frame to the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Nothing detected, nothing recording.
    Idle,
    /// First detection: open a clip; this frame belongs to it.
    Start,
    /// Recording with a detection in view.
    Recording,
    /// Detection lost; post-roll timer started.
    CooldownStarted,
    /// Still inside the post-roll window.
    Cooldown,
    /// Post-roll elapsed: close the clip. This frame is not part of it.
    Stop,
}

impl TriggerEvent {
    /// Whether the frame that produced this event is written to the clip.
    pub fn writes_frame(&self) -> bool {
        matches!(
            self,
            TriggerEvent::Start
                | TriggerEvent::Recording
                | TriggerEvent::CooldownStarted
                | TriggerEvent::Cooldown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Recording { lost_at: Option<Duration> },
}

/// Idle/Recording state machine with a post-roll timer.
#[derive(Debug, Clone)]
pub struct RecordingTrigger {
    post_roll: Duration,
    state: State,
}

impl RecordingTrigger {
    pub fn new(post_roll: Duration) -> Self {
        Self {
            post_roll,
            state: State::Idle,
        }
    }

    pub fn post_roll(&self) -> Duration {
        self.post_roll
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording { .. })
    }

    pub fn advance(&mut self, detected: bool, now: Duration) -> TriggerEvent {
        match (self.state, detected) {
            (State::Idle, false) => TriggerEvent::Idle,
            (State::Idle, true) => {
                self.state = State::Recording { lost_at: None };
                TriggerEvent::Start
            }
            (State::Recording { .. }, true) => {
                self.state = State::Recording { lost_at: None };
                TriggerEvent::Recording
            }
            (State::Recording { lost_at: None }, false) => {
                self.state = State::Recording { lost_at: Some(now) };
                TriggerEvent::CooldownStarted
            }
            (State::Recording { lost_at: Some(since) }, false) => {
                if now.saturating_sub(since) >= self.post_roll {
                    self.state = State::Idle;
                    TriggerEvent::Stop
                } else {
                    TriggerEvent::Cooldown
                }
            }
        }
    }
}

impl Default for RecordingTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_POST_ROLL)
    }
}
