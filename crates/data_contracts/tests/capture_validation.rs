use chrono::{Duration, Local};
use data_contracts::{ClipManifest, ClipManifestSchemaVersion, ValidationError};

fn manifest() -> ClipManifest {
    let started_at = Local::now();
    ClipManifest {
        schema_version: ClipManifestSchemaVersion::V1,
        clip: "19-10-2026-10-00-00.mp4".into(),
        started_at,
        ended_at: started_at + Duration::seconds(7),
        frames: 140,
        size: (640, 480),
        fps: 20.0,
        peak_faces: 2,
        peak_bodies: 1,
        detection_frames: 40,
    }
}

#[test]
fn valid_manifest_passes() {
    let meta = manifest();
    assert!(meta.validate().is_ok());
    assert!((meta.duration_secs() - 7.0).abs() < 1e-9);
}

#[test]
fn reversed_time_range_rejected() {
    let mut meta = manifest();
    meta.ended_at = meta.started_at - Duration::seconds(1);
    assert_eq!(meta.validate().unwrap_err(), ValidationError::InvalidTimeRange);
}

#[test]
fn zero_fps_rejected() {
    let mut meta = manifest();
    meta.fps = 0.0;
    assert!(matches!(meta.validate(), Err(ValidationError::InvalidFps(_))));
}

#[test]
fn detection_frames_bounded_by_frames() {
    let mut meta = manifest();
    meta.detection_frames = 141;
    assert!(matches!(
        meta.validate(),
        Err(ValidationError::DetectionFrames { .. })
    ));
}

#[test]
fn manifest_round_trips_through_json() {
    let meta = manifest();
    let raw = serde_json::to_string_pretty(&meta).unwrap();
    assert!(raw.contains("\"clip\": \"19-10-2026-10-00-00.mp4\""));
    let back: ClipManifest = serde_json::from_str(&raw).unwrap();
    assert_eq!(back.frames, 140);
    assert_eq!(back.size, (640, 480));
}
