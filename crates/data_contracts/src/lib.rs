//! Shared data contracts for recorded clips, sessions, and face datasets.

pub mod capture;
pub mod dataset;
pub mod manifest;

pub use capture::{ClipManifest, ClipManifestSchemaVersion, ValidationError};
pub use dataset::{DatasetConfig, YoloBox};
pub use manifest::{SessionManifest, SessionManifestSchemaVersion};
