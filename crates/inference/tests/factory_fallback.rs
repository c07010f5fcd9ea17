use inference::prelude::{CascadePaths, DetectorFactory, DetectorThresholds};
use std::path::Path;
use vision_core::prelude::{DetectionKind, Frame};

const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>6</height>
  <width>6</width>
  <stages>
    <_>
      <stageThreshold>-0.5</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 0.1</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>1 1 4 2 -1.</_>
        <_>1 3 4 2 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

fn write_cascade(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, EDGE_CASCADE).expect("write cascade");
    path
}

fn block_frame() -> Frame {
    let (w, h) = (24u32, 24u32);
    let mut rgb = vec![128u8; (w * h * 3) as usize];
    for y in 8..14u32 {
        for x in 8..14u32 {
            let v = if y < 11 { 0 } else { 255 };
            let i = ((y * w + x) * 3) as usize;
            rgb[i..i + 3].copy_from_slice(&[v, v, v]);
        }
    }
    Frame::new(7, 0.0, rgb, (w, h)).unwrap()
}

#[test]
fn missing_face_cascade_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let paths = CascadePaths::in_dir(dir.path());
    let err = DetectorFactory
        .build(&paths, DetectorThresholds::face(), DetectorThresholds::body())
        .err()
        .expect("face cascade is required");
    assert!(format!("{err:#}").contains("face cascade"));
}

#[test]
fn missing_body_cascade_disables_body_detection() {
    let dir = tempfile::tempdir().unwrap();
    write_cascade(dir.path(), CascadePaths::FACE_FILE);
    let paths = CascadePaths::in_dir(dir.path());
    let set = DetectorFactory
        .build(&paths, DetectorThresholds::face(), DetectorThresholds::body())
        .expect("face only");
    assert_eq!(set.kinds(), vec![DetectionKind::Face]);
}

#[test]
fn detector_set_merges_all_kinds() {
    let dir = tempfile::tempdir().unwrap();
    write_cascade(dir.path(), CascadePaths::FACE_FILE);
    write_cascade(dir.path(), CascadePaths::BODY_FILE);
    let paths = CascadePaths::in_dir(dir.path());
    let loose = DetectorThresholds {
        scale_factor: 1.1,
        min_neighbors: 0,
        min_size: (0, 0),
    };
    let set = DetectorFactory.build(&paths, loose, loose).unwrap();
    assert_eq!(set.kinds(), vec![DetectionKind::Face, DetectionKind::Body]);

    let result = set.detect(&block_frame());
    assert_eq!(result.frame_id, 7);
    assert!(result.count(DetectionKind::Face) > 0);
    assert_eq!(
        result.count(DetectionKind::Face),
        result.count(DetectionKind::Body)
    );
    assert!(result
        .detections
        .iter()
        .any(|d| d.bbox_px == [8, 8, 14, 14]));
}
