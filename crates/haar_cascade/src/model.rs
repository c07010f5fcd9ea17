//! Cascade model types and OpenCV XML loading.

use crate::error::{CascadeError, CascadeResult};
use roxmltree::Node;
use std::path::Path;
use std::str::FromStr;

/// Weighted rectangle of a Haar feature, in base-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaarRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
    /// Rectangles are rotated 45 degrees and read from the tilted integral.
    pub tilted: bool,
}

/// Decision node. A child index `<= 0` refers to leaf `-index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub feature: usize,
    pub threshold: f32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub threshold: f32,
    pub classifiers: Vec<WeakClassifier>,
}

/// Boosted Haar cascade with a fixed base window.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub window: (u32, u32),
    pub stages: Vec<Stage>,
    pub features: Vec<HaarFeature>,
}

impl Cascade {
    pub fn from_file(path: &Path) -> CascadeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| CascadeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cascade = Self::from_xml_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            stages = cascade.stages.len(),
            features = cascade.features.len(),
            window = ?cascade.window,
            "loaded cascade"
        );
        Ok(cascade)
    }

    pub fn from_xml_str(raw: &str) -> CascadeResult<Self> {
        let doc = roxmltree::Document::parse(raw)?;
        let root = doc.root_element();
        let body = elements(root)
            .next()
            .ok_or_else(|| CascadeError::Missing("cascade".into()))?;
        let cascade = if find(body, "stageType").is_some() {
            parse_current(body)?
        } else if find(body, "size").is_some() {
            parse_legacy(body)?
        } else {
            return Err(CascadeError::Unsupported(format!(
                "unrecognized cascade layout <{}>",
                body.tag_name().name()
            )));
        };
        cascade.check()?;
        Ok(cascade)
    }

    pub fn has_tilted(&self) -> bool {
        self.features.iter().any(|f| f.tilted)
    }

    /// Structural checks so evaluation can index without bounds surprises.
    fn check(&self) -> CascadeResult<()> {
        let (ww, wh) = (self.window.0 as i32, self.window.1 as i32);
        if ww < 3 || wh < 3 {
            return Err(CascadeError::Malformed(format!(
                "window {}x{} is too small",
                ww, wh
            )));
        }
        if self.stages.is_empty() {
            return Err(CascadeError::Malformed("cascade has no stages".into()));
        }
        for (fi, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(CascadeError::Malformed(format!("feature {fi} has no rects")));
            }
            for r in &feature.rects {
                let inside = if feature.tilted {
                    r.x - r.height >= 0
                        && r.y >= 0
                        && r.x + r.width <= ww
                        && r.y + r.width + r.height <= wh
                } else {
                    r.x >= 0 && r.y >= 0 && r.x + r.width <= ww && r.y + r.height <= wh
                };
                if !inside || r.width < 0 || r.height < 0 {
                    return Err(CascadeError::Malformed(format!(
                        "feature {fi} rect {r:?} leaves the {ww}x{wh} window"
                    )));
                }
            }
        }
        for (si, stage) in self.stages.iter().enumerate() {
            if stage.classifiers.is_empty() {
                return Err(CascadeError::Malformed(format!("stage {si} is empty")));
            }
            for wc in &stage.classifiers {
                if wc.nodes.is_empty() {
                    return Err(CascadeError::Malformed(format!(
                        "stage {si} has a classifier without nodes"
                    )));
                }
                for (ni, node) in wc.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Malformed(format!(
                            "stage {si} node references feature {} of {}",
                            node.feature,
                            self.features.len()
                        )));
                    }
                    for child in [node.left, node.right] {
                        let ok = if child > 0 {
                            (child as usize) > ni && (child as usize) < wc.nodes.len()
                        } else {
                            ((-child) as usize) < wc.leaves.len()
                        };
                        if !ok {
                            return Err(CascadeError::Malformed(format!(
                                "stage {si} node {ni} has bad child {child}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

fn find<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|c| c.tag_name().name() == name)
}

fn require<'a, 'input>(node: Node<'a, 'input>, name: &str) -> CascadeResult<Node<'a, 'input>> {
    find(node, name).ok_or_else(|| CascadeError::Missing(name.to_string()))
}

fn text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect::<Vec<_>>()
        .join(" ")
}

fn numbers<T: FromStr>(node: Node<'_, '_>) -> CascadeResult<Vec<T>> {
    text(node)
        .split_whitespace()
        .map(|tok| {
            tok.parse::<T>().map_err(|_| CascadeError::Number {
                element: node.tag_name().name().to_string(),
                value: tok.to_string(),
            })
        })
        .collect()
}

fn number<T: FromStr>(node: Node<'_, '_>, name: &str) -> CascadeResult<T> {
    let el = require(node, name)?;
    let raw = text(el);
    raw.trim().parse::<T>().map_err(|_| CascadeError::Number {
        element: name.to_string(),
        value: raw.trim().to_string(),
    })
}

fn parse_rects(rects: Node<'_, '_>) -> CascadeResult<Vec<HaarRect>> {
    elements(rects)
        .map(|r| {
            let vals: Vec<f32> = numbers(r)?;
            if vals.len() != 5 {
                return Err(CascadeError::Malformed(format!(
                    "rect has {} values, expected 5",
                    vals.len()
                )));
            }
            Ok(HaarRect {
                x: vals[0] as i32,
                y: vals[1] as i32,
                width: vals[2] as i32,
                height: vals[3] as i32,
                weight: vals[4],
            })
        })
        .collect()
}

fn parse_feature(node: Node<'_, '_>) -> CascadeResult<HaarFeature> {
    let rects = parse_rects(require(node, "rects")?)?;
    let tilted = match find(node, "tilted") {
        Some(_) => number::<i32>(node, "tilted")? != 0,
        None => false,
    };
    Ok(HaarFeature { rects, tilted })
}

/// `<cascade>` layout written by opencv_traincascade.
fn parse_current(body: Node<'_, '_>) -> CascadeResult<Cascade> {
    let stage_type = text(require(body, "stageType")?);
    if stage_type.trim() != "BOOST" {
        return Err(CascadeError::Unsupported(format!(
            "stage type {}",
            stage_type.trim()
        )));
    }
    let feature_type = text(require(body, "featureType")?);
    if feature_type.trim() != "HAAR" {
        return Err(CascadeError::Unsupported(format!(
            "feature type {}",
            feature_type.trim()
        )));
    }
    let width: u32 = number(body, "width")?;
    let height: u32 = number(body, "height")?;

    let mut stages = Vec::new();
    for stage in elements(require(body, "stages")?) {
        let threshold: f32 = number(stage, "stageThreshold")?;
        let mut classifiers = Vec::new();
        for weak in elements(require(stage, "weakClassifiers")?) {
            let raw_nodes: Vec<f64> = numbers(require(weak, "internalNodes")?)?;
            let leaves: Vec<f32> = numbers(require(weak, "leafValues")?)?;
            if raw_nodes.is_empty() || raw_nodes.len() % 4 != 0 {
                return Err(CascadeError::Malformed(format!(
                    "internalNodes has {} values; categorical splits are not supported",
                    raw_nodes.len()
                )));
            }
            let nodes = raw_nodes
                .chunks_exact(4)
                .map(|n| TreeNode {
                    left: n[0] as i32,
                    right: n[1] as i32,
                    feature: n[2] as usize,
                    threshold: n[3] as f32,
                })
                .collect();
            classifiers.push(WeakClassifier { nodes, leaves });
        }
        stages.push(Stage {
            threshold,
            classifiers,
        });
    }

    let features = elements(require(body, "features")?)
        .map(parse_feature)
        .collect::<CascadeResult<Vec<_>>>()?;

    Ok(Cascade {
        window: (width, height),
        stages,
        features,
    })
}

/// Legacy `opencv-haar-classifier` layout with inline features.
fn parse_legacy(body: Node<'_, '_>) -> CascadeResult<Cascade> {
    let size: Vec<u32> = numbers(require(body, "size")?)?;
    if size.len() != 2 {
        return Err(CascadeError::Malformed("<size> needs width and height".into()));
    }
    let mut features = Vec::new();
    let mut stages = Vec::new();
    for stage in elements(require(body, "stages")?) {
        let threshold: f32 = number(stage, "stage_threshold")?;
        let mut classifiers = Vec::new();
        for tree in elements(require(stage, "trees")?) {
            let mut nodes = Vec::new();
            let mut leaves = Vec::new();
            for node in elements(tree) {
                features.push(parse_feature(require(node, "feature")?)?);
                let feature = features.len() - 1;
                let threshold: f32 = number(node, "threshold")?;
                let mut child = |val: &str, idx: &str| -> CascadeResult<i32> {
                    if find(node, val).is_some() {
                        leaves.push(number::<f32>(node, val)?);
                        Ok(-((leaves.len() - 1) as i32))
                    } else {
                        number::<i32>(node, idx)
                    }
                };
                let left = child("left_val", "left_node")?;
                let right = child("right_val", "right_node")?;
                nodes.push(TreeNode {
                    feature,
                    threshold,
                    left,
                    right,
                });
            }
            classifiers.push(WeakClassifier { nodes, leaves });
        }
        stages.push(Stage {
            threshold,
            classifiers,
        });
    }
    Ok(Cascade {
        window: (size[0], size[1]),
        stages,
        features,
    })
}
