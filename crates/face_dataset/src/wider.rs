//! WIDER FACE ground-truth lists (`wider_face_<split>_bbx_gt.txt`).

use crate::types::{DatasetError, DatasetResult};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One annotated face: pixel box plus WIDER attribute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WiderBox {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    pub blur: u8,
    pub expression: u8,
    pub illumination: u8,
    pub invalid: bool,
    pub occlusion: u8,
    pub pose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiderEntry {
    /// Image path relative to the split's image directory.
    pub image: PathBuf,
    pub boxes: Vec<WiderBox>,
}

/// Ground-truth file and image directory of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiderSplit {
    pub name: String,
    pub gt_file: PathBuf,
    pub images_dir: PathBuf,
}

impl WiderSplit {
    /// Layout of the official archives extracted under `root`:
    /// `wider_face_split/wider_face_<split>_bbx_gt.txt` and `WIDER_<split>/images`.
    pub fn standard(root: &Path, split: &str) -> Self {
        Self {
            name: split.to_string(),
            gt_file: root
                .join("wider_face_split")
                .join(format!("wider_face_{split}_bbx_gt.txt")),
            images_dir: root.join(format!("WIDER_{split}")).join("images"),
        }
    }
}

fn parse_box(path: &Path, line_no: usize, line: &str) -> DatasetResult<WiderBox> {
    let fields: Vec<i64> = line
        .split_whitespace()
        .map(|f| f.parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            msg: format!("bad box field: {e}"),
        })?;
    if fields.len() < 4 {
        return Err(DatasetError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            msg: format!("expected at least 4 box fields, got {}", fields.len()),
        });
    }
    let attr = |i: usize| fields.get(i).copied().unwrap_or(0).clamp(0, u8::MAX as i64) as u8;
    Ok(WiderBox {
        x: fields[0],
        y: fields[1],
        w: fields[2],
        h: fields[3],
        blur: attr(4),
        expression: attr(5),
        illumination: attr(6),
        invalid: attr(7) != 0,
        occlusion: attr(8),
        pose: attr(9),
    })
}

/// Parse a ground-truth list: image path line, box count line, then one
/// line per box. A zero count is followed by a single all-zero placeholder.
/// `source` only labels errors.
pub fn parse_wider_gt<R: BufRead>(reader: R, source: &Path) -> DatasetResult<Vec<WiderEntry>> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| l.as_ref().map(|s| !s.trim().is_empty()).unwrap_or(true));
    let mut next = |what: &str| -> DatasetResult<Option<(usize, String)>> {
        match lines.next() {
            Some((n, Ok(line))) => Ok(Some((n, line.trim().to_string()))),
            Some((_, Err(e))) => Err(DatasetError::io(source, e)),
            None => {
                if what == "image" {
                    Ok(None)
                } else {
                    Err(DatasetError::Parse {
                        path: source.to_path_buf(),
                        line: 0,
                        msg: format!("unexpected end of file, expected {what}"),
                    })
                }
            }
        }
    };

    let mut entries = Vec::new();
    while let Some((_, image)) = next("image")? {
        let (count_line, raw_count) = next("box count")?.unwrap_or_default();
        let count: usize = raw_count.parse().map_err(|_| DatasetError::Parse {
            path: source.to_path_buf(),
            line: count_line,
            msg: format!("bad box count {raw_count:?} for {image}"),
        })?;
        let mut boxes = Vec::with_capacity(count);
        if count == 0 {
            next("placeholder box")?;
        }
        for _ in 0..count {
            let (n, line) = next("box")?.unwrap_or_default();
            boxes.push(parse_box(source, n, &line)?);
        }
        entries.push(WiderEntry {
            image: PathBuf::from(image),
            boxes,
        });
    }
    Ok(entries)
}

pub fn load_wider_gt(path: &Path) -> DatasetResult<Vec<WiderEntry>> {
    let file = fs::File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let entries = parse_wider_gt(BufReader::new(file), path)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "ground truth loaded");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GT: &str = "\
0--Parade/0_Parade_marchingband_1_849.jpg
1
449 330 122 149 0 0 0 0 0 0 
0--Parade/0_Parade_Parade_0_904.jpg
0
0 0 0 0 0 0 0 0 0 0 
1--Handshaking/1_Handshaking_1_158.jpg
2
10 20 30 40 2 0 1 0 0 1 
5 5 0 0 0 0 0 1 0 0 
";

    fn parse(text: &str) -> DatasetResult<Vec<WiderEntry>> {
        parse_wider_gt(text.as_bytes(), Path::new("gt.txt"))
    }

    #[test]
    fn parses_entries_and_placeholder() {
        let entries = parse(GT).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0].image,
            PathBuf::from("0--Parade/0_Parade_marchingband_1_849.jpg")
        );
        assert_eq!(entries[0].boxes[0].w, 122);
        assert!(entries[1].boxes.is_empty());
        assert_eq!(entries[2].boxes.len(), 2);
        assert_eq!(entries[2].boxes[0].blur, 2);
        assert_eq!(entries[2].boxes[0].pose, 1);
        assert!(entries[2].boxes[1].invalid);
    }

    #[test]
    fn truncated_file_is_an_error() {
        let err = parse("a.jpg\n2\n1 2 3 4 0 0 0 0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn bad_count_reports_line() {
        let err = parse("a.jpg\nmany\n").unwrap_err();
        match err {
            DatasetError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn standard_layout_paths() {
        let split = WiderSplit::standard(Path::new("/data/wider"), "val");
        assert_eq!(
            split.gt_file,
            PathBuf::from("/data/wider/wider_face_split/wider_face_val_bbx_gt.txt")
        );
        assert_eq!(split.images_dir, PathBuf::from("/data/wider/WIDER_val/images"));
    }
}
