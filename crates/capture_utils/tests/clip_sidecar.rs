use capture_utils::JsonClipSidecar;
use chrono::{Duration, Local};
use data_contracts::capture::{ClipManifest, ClipManifestSchemaVersion};

fn manifest(clip: &str) -> ClipManifest {
    let started_at = Local::now();
    ClipManifest {
        schema_version: ClipManifestSchemaVersion::V1,
        clip: clip.to_string(),
        started_at,
        ended_at: started_at + Duration::seconds(6),
        frames: 120,
        size: (640, 480),
        fps: 20.0,
        peak_faces: 2,
        peak_bodies: 1,
        detection_frames: 20,
    }
}

#[test]
fn sidecar_lands_next_to_clip() {
    let tmp = tempfile::tempdir().unwrap();
    let clip = tmp.path().join("19-10-2026-12-00-00.mp4");
    let written = JsonClipSidecar
        .write(&clip, &manifest("19-10-2026-12-00-00.mp4"))
        .expect("write sidecar");
    assert_eq!(written, tmp.path().join("19-10-2026-12-00-00.json"));

    let contents = std::fs::read_to_string(&written).unwrap();
    assert!(contents.contains("\"frames\": 120"));
    assert!(contents.ends_with('\n'));

    let back = JsonClipSidecar::read(&written).unwrap();
    assert_eq!(back.peak_faces, 2);
    assert_eq!(back.clip, "19-10-2026-12-00-00.mp4");
}

#[test]
fn invalid_manifest_is_not_written() {
    let tmp = tempfile::tempdir().unwrap();
    let clip = tmp.path().join("bad.mp4");
    let mut bad = manifest("bad.mp4");
    bad.fps = 0.0;
    let err = JsonClipSidecar.write(&clip, &bad).unwrap_err();
    assert!(err.to_string().contains("validation failed"));
    assert!(!JsonClipSidecar::path_for(&clip).exists());
}
