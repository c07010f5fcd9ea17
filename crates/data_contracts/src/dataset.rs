use crate::capture::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const FACE_CLASS_ID: u32 = 0;

/// One YOLO label line: class id and a normalized center/size box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: u32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl YoloBox {
    /// Build from a pixel-space `x, y, w, h` box on an image of `dims`.
    pub fn from_pixels(class_id: u32, xywh: [f32; 4], dims: (u32, u32)) -> Self {
        let (iw, ih) = (dims.0.max(1) as f32, dims.1.max(1) as f32);
        let [x, y, w, h] = xywh;
        Self {
            class_id,
            cx: (x + w / 2.0) / iw,
            cy: (y + h / 2.0) / ih,
            w: w / iw,
            h: h / ih,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }

    pub fn parse(line: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ValidationError::YoloFieldCount(fields.len()));
        }
        let class_id = fields[0]
            .parse::<u32>()
            .map_err(|_| ValidationError::YoloParse {
                field: "class_id",
                value: fields[0].to_string(),
            })?;
        let num = |field: &'static str, raw: &str| -> Result<f32, ValidationError> {
            raw.parse::<f32>().map_err(|_| ValidationError::YoloParse {
                field,
                value: raw.to_string(),
            })
        };
        let parsed = Self {
            class_id,
            cx: num("cx", fields[1])?,
            cy: num("cy", fields[2])?,
            w: num("w", fields[3])?,
            h: num("h", fields[4])?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Center and size must lie in 0..=1 and the box must have area.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let vals = [self.cx, self.cy, self.w, self.h];
        let in_range = vals.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v));
        if !in_range || self.w <= 0.0 || self.h <= 0.0 {
            return Err(ValidationError::YoloOutOfRange(vals));
        }
        Ok(())
    }

    /// Normalized corner box \[x0, y0, x1, y1\].
    pub fn corners(&self) -> [f32; 4] {
        [
            self.cx - self.w / 2.0,
            self.cy - self.h / 2.0,
            self.cx + self.w / 2.0,
            self.cy + self.h / 2.0,
        ]
    }
}

impl fmt::Display for YoloBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Dataset description consumed by the external trainer (`face.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub train: String,
    pub val: String,
    pub names: BTreeMap<u32, String>,
}

impl DatasetConfig {
    pub fn faces(root: impl Into<PathBuf>) -> Self {
        Self {
            path: root.into(),
            train: "images/train".to_string(),
            val: "images/val".to_string(),
            names: BTreeMap::from([(FACE_CLASS_ID, "face".to_string())]),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}
