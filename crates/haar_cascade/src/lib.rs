//! Haar cascade object detection.
//!
//! This crate provides:
//! - Loading OpenCV cascade XML (current `opencv-cascade-classifier` and
//!   legacy `opencv-haar-classifier` layouts)
//! - Integral, squared, and tilted integral images
//! - Stage-by-stage window classification with variance normalization
//! - Multi-scale sliding-window detection and rectangle grouping

pub mod detect;
pub mod error;
pub mod group;
pub mod integral;
pub mod model;

pub use detect::{detect_multi_scale, DetectParams, Detected};
pub use error::{CascadeError, CascadeResult};
pub use group::{group_rectangles, Rect};
pub use integral::IntegralImage;
pub use model::{Cascade, HaarFeature, HaarRect, Stage, TreeNode, WeakClassifier};
