//! Watchpost umbrella crate: re-export the workspace crates behind features.

#[cfg(feature = "vision-core")]
pub use vision_core;

#[cfg(feature = "data-contracts")]
pub use data_contracts;

#[cfg(feature = "haar-cascade")]
pub use haar_cascade;

#[cfg(feature = "inference")]
pub use inference;

#[cfg(feature = "capture-utils")]
pub use capture_utils;

#[cfg(feature = "watch-core")]
pub use watch_core;

#[cfg(feature = "face-dataset")]
pub use face_dataset;

#[cfg(feature = "cli-support")]
pub use cli_support;
