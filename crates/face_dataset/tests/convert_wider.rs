use data_contracts::dataset::{DatasetConfig, YoloBox};
use face_dataset::{
    convert_split, validate_summary, write_dataset_config, ConvertOptions, ValidationOutcome,
    ValidationThresholds, WiderSplit,
};
use std::fs;
use std::path::Path;

fn write_png(path: &Path, w: u32, h: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::new(w, h).save(path).unwrap();
}

fn fixture(root: &Path) -> WiderSplit {
    let split = WiderSplit::standard(root, "train");
    write_png(&split.images_dir.join("0--Parade/a.png"), 100, 50);
    write_png(&split.images_dir.join("1--Handshaking/b.png"), 40, 40);
    // c.png is listed but never written.
    fs::create_dir_all(split.gt_file.parent().unwrap()).unwrap();
    fs::write(
        &split.gt_file,
        "\
0--Parade/a.png
2
10 10 20 10 0 0 0 0 0 0 
90 40 20 20 0 0 0 0 0 0 
1--Handshaking/b.png
1
5 5 10 10 0 0 0 1 0 0 
2--Demonstration/c.png
0
0 0 0 0 0 0 0 0 0 0 
",
    )
    .unwrap();
    split
}

#[test]
fn converts_split_into_yolo_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let split = fixture(&tmp.path().join("wider"));
    let out = tmp.path().join("yolo");

    let summary = convert_split(&split, &ConvertOptions::new(&out)).expect("convert");
    assert_eq!(summary.split, "train");
    assert_eq!(summary.images, 3);
    assert_eq!(summary.labels_written, 2);
    assert_eq!(summary.boxes, 2);
    assert_eq!(summary.skipped_boxes, 1);
    assert_eq!(summary.missing_images, 1);
    assert_eq!(summary.empty_images, 1);

    let label = fs::read_to_string(out.join("labels/train/0--Parade_a.txt")).unwrap();
    let boxes: Vec<YoloBox> = label.lines().map(|l| YoloBox::parse(l).unwrap()).collect();
    assert_eq!(boxes.len(), 2);
    assert_eq!(boxes[0].to_line(), "0 0.200000 0.300000 0.200000 0.200000");
    // Second box clipped to the image corner: x 90..100, y 40..50.
    assert_eq!(boxes[1].to_line(), "0 0.950000 0.900000 0.100000 0.200000");

    assert!(out.join("images/train/0--Parade_a.png").exists());
    let empty = fs::read_to_string(out.join("labels/train/1--Handshaking_b.txt")).unwrap();
    assert!(empty.is_empty());
    assert!(!out.join("labels/train/2--Demonstration_c.txt").exists());

    let report = validate_summary(
        summary,
        &ValidationThresholds {
            max_missing: Some(0),
            ..ValidationThresholds::default()
        },
    );
    assert_eq!(report.outcome, ValidationOutcome::Fail);
}

#[test]
fn dataset_config_points_at_splits() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_dataset_config(tmp.path(), "train", "val").unwrap();
    assert_eq!(path.file_name().unwrap(), "face.yaml");
    let config = DatasetConfig::from_yaml(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config.train, "images/train");
    assert_eq!(config.val, "images/val");
    assert_eq!(config.names.get(&0).map(String::as_str), Some("face"));
    assert_eq!(config.path, tmp.path());
}

#[test]
fn missing_ground_truth_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let split = WiderSplit::standard(tmp.path(), "val");
    let err = convert_split(&split, &ConvertOptions::new(tmp.path().join("out"))).unwrap_err();
    assert!(err.to_string().contains("wider_face_val_bbx_gt.txt"));
}
