pub mod factory;

pub use factory::{CascadeDetector, CascadePaths, DetectorFactory, DetectorSet, DetectorThresholds};

pub mod prelude {
    pub use crate::factory::{
        CascadeDetector, CascadePaths, DetectorFactory, DetectorSet, DetectorThresholds,
    };
}
