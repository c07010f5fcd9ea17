use std::time::Duration;
use watchpost::vision_core::prelude::{Detection, DetectionKind, DetectionResult};
use watchpost::watch_core::{RecordingTrigger, TriggerEvent, DEFAULT_POST_ROLL};

#[test]
fn default_features_cover_the_watch_path() {
    let mut result = DetectionResult::empty(1);
    result.detections.push(Detection {
        kind: DetectionKind::Face,
        bbox_px: [0, 0, 4, 4],
        neighbors: 6,
    });
    let mut trigger = RecordingTrigger::new(DEFAULT_POST_ROLL);
    assert_eq!(
        trigger.advance(result.is_positive(), Duration::ZERO),
        TriggerEvent::Start
    );
    assert!(watchpost::inference::CascadePaths::FACE_FILE.ends_with(".xml"));
}
