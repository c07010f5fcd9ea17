use haar_cascade::{detect_multi_scale, Cascade, DetectParams, Detected, IntegralImage, Rect};
use image::{GrayImage, Luma};

/// 10x10 window that fires only when its inner 8x8 is one flat, bright value.
///
/// A flat patch has zero variance, so the normalized feature is the raw sum
/// (64 * value); any texture divides it down to roughly mean / stddev.
const FLAT_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>10</height>
  <width>10</width>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>-0.5</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 5000.</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>1 1 8 8 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

/// Same classifier in the pre-traincascade layout.
const FLAT_CASCADE_LEGACY: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<haarcascade_flat type_id="opencv-haar-classifier">
  <size>10 10</size>
  <stages>
    <_>
      <!-- stage 0 -->
      <trees>
        <_>
          <!-- tree 0 -->
          <_>
            <feature>
              <rects>
                <_>1 1 8 8 1.</_></rects>
              <tilted>0</tilted></feature>
            <threshold>5000.</threshold>
            <left_val>-1.</left_val>
            <right_val>1.</right_val></_></_></trees>
      <stage_threshold>0.</stage_threshold>
      <parent>-1</parent>
      <next>-1</next></_></stages></haarcascade_flat>
</opencv_storage>
"#;

/// 6x6 window with one 45-degree rect: the diamond of pixels
/// (2,0) (1..=3,1) (1..=3,2) (2,3).
const DIAMOND_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>6</height>
  <width>6</width>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>-0.5</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 0.5</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>3 0 2 2 1.</_></rects>
      <tilted>1</tilted></_></features></cascade>
</opencv_storage>
"#;

const DIAMOND: [(u32, u32); 8] = [
    (2, 0),
    (1, 1),
    (2, 1),
    (3, 1),
    (1, 2),
    (2, 2),
    (3, 2),
    (2, 3),
];

fn cascade(xml: &str) -> Cascade {
    Cascade::from_xml_str(xml).expect("cascade")
}

/// Dark `w`x`h` image with a bright (200) rectangle `[x0, x1) x [y0, y1)`.
fn bright_patch(w: u32, h: u32, xs: (u32, u32), ys: (u32, u32)) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let inside = (xs.0..xs.1).contains(&x) && (ys.0..ys.1).contains(&y);
        Luma([if inside { 200 } else { 0 }])
    })
}

fn rects(found: &[Detected]) -> Vec<(Rect, u32)> {
    found.iter().map(|d| (d.rect, d.neighbors)).collect()
}

#[test]
fn legacy_cascade_detects_end_to_end() {
    let legacy = cascade(FLAT_CASCADE_LEGACY);
    assert_eq!(legacy.window, (10, 10));

    // Only the window at (6, 2) has its inner 8x8 inside the patch.
    let img = bright_patch(30, 20, (7, 15), (3, 11));
    let params = DetectParams {
        min_neighbors: 0,
        max_size: Some((10, 10)),
        ..DetectParams::default()
    };
    let found = detect_multi_scale(&legacy, &img, &params).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(6, 2, 10, 10), 1)]);

    let current = detect_multi_scale(&cascade(FLAT_CASCADE), &img, &params).unwrap();
    assert_eq!(found, current);
}

#[test]
fn tilted_feature_reads_the_rotated_sum() {
    let cascade = cascade(DIAMOND_CASCADE);
    assert!(cascade.has_tilted());

    let mut lit = GrayImage::new(6, 6);
    for &(x, y) in &DIAMOND {
        lit.put_pixel(x, y, Luma([200]));
    }
    assert!(cascade.classify_window(&IntegralImage::new(&lit, true), 0, 0));
    // Without the tilted table the rotated sum reads as zero.
    assert!(!cascade.classify_window(&IntegralImage::new(&lit, false), 0, 0));

    let mut dark = GrayImage::from_pixel(6, 6, Luma([200]));
    for &(x, y) in &DIAMOND {
        dark.put_pixel(x, y, Luma([0]));
    }
    assert!(!cascade.classify_window(&IntegralImage::new(&dark, true), 0, 0));

    let mut shifted = GrayImage::new(12, 10);
    for &(x, y) in &DIAMOND {
        shifted.put_pixel(x + 4, y + 2, Luma([200]));
    }
    let ii = IntegralImage::new(&shifted, true);
    assert!(cascade.classify_window(&ii, 4, 2));
    assert!(!cascade.classify_window(&ii, 0, 0));

    let params = DetectParams {
        min_neighbors: 0,
        ..DetectParams::default()
    };
    let found = detect_multi_scale(&cascade, &lit, &params).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(0, 0, 6, 6), 1)]);
}

#[test]
fn upscaled_hits_map_back_to_image_pixels() {
    let cascade = cascade(FLAT_CASCADE);

    // Halved, the patch leaves one flat 8x8 block at (5, 7); step is 2.
    let img = bright_patch(40, 40, (8, 28), (12, 32));
    let params = DetectParams {
        scale_factor: 2.0,
        min_neighbors: 0,
        min_size: (20, 20),
        max_size: Some((20, 20)),
    };
    assert_eq!(cascade.scales((40, 40), &params), vec![2.0]);
    let found = detect_multi_scale(&cascade, &img, &params).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(8, 12, 20, 20), 1)]);

    // At a third the step drops to 1, so the hit sits at odd level coordinates (3, 5).
    let img = bright_patch(60, 60, (10, 38), (16, 44));
    let params = DetectParams {
        scale_factor: 3.0,
        min_neighbors: 0,
        min_size: (30, 30),
        max_size: Some((30, 30)),
    };
    assert_eq!(cascade.scales((60, 60), &params), vec![3.0]);
    let found = detect_multi_scale(&cascade, &img, &params).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(9, 15, 30, 30), 1)]);
}

/// 60x60 checkerboard (200/0) with a solid 200 patch over `[25, 35)`.
///
/// At full size only the patch is flat. Halving blurs the checkerboard to a
/// flat 100 everywhere the patch does not reach.
fn checkerboard_with_patch() -> GrayImage {
    GrayImage::from_fn(60, 60, |x, y| {
        let patch = (25..35).contains(&x) && (25..35).contains(&y);
        Luma([if patch || (x + y) % 2 == 0 { 200 } else { 0 }])
    })
}

#[test]
fn neighbours_are_grouped_and_nested_clusters_dropped() {
    let cascade = cascade(FLAT_CASCADE);
    let img = checkerboard_with_patch();

    // Base scale alone: four windows on the patch average to one rect.
    let base_only = DetectParams {
        scale_factor: 2.0,
        min_neighbors: 3,
        min_size: (0, 0),
        max_size: Some((10, 10)),
    };
    let found = detect_multi_scale(&cascade, &img, &base_only).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(25, 25, 10, 10), 4)]);

    let raw = detect_multi_scale(
        &cascade,
        &img,
        &DetectParams {
            min_neighbors: 0,
            max_size: Some((20, 20)),
            ..base_only
        },
    )
    .unwrap();
    // 4 on the patch plus a 72-window ring at half size around it.
    assert_eq!(raw.len(), 76);
    assert!(raw.iter().any(|d| d.rect == Rect::new(24, 26, 10, 10)));
    assert!(raw.iter().any(|d| d.rect == Rect::new(36, 0, 20, 20)));
    assert!(raw.iter().all(|d| d.neighbors == 1));

    // With both scales the ring averages to a box around the patch and the
    // weaker patch cluster is dropped as nested.
    let both = DetectParams {
        max_size: Some((20, 20)),
        ..base_only
    };
    let found = detect_multi_scale(&cascade, &img, &both).unwrap();
    assert_eq!(rects(&found), vec![(Rect::new(20, 20, 20, 20), 72)]);

    let strict = DetectParams {
        min_neighbors: 72,
        ..both
    };
    assert!(detect_multi_scale(&cascade, &img, &strict).unwrap().is_empty());
}
