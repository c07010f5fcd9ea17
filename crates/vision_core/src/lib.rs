//! vision_core: shared frame/detector/recorder interfaces.

pub mod capture;
pub mod interfaces;
pub mod overlay;

pub mod prelude {
    pub use crate::capture::CaptureLimit;
    pub use crate::interfaces::*;
    pub use crate::overlay::*;
}
