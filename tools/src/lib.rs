pub mod dataset;
pub mod detect;

pub use dataset::{convert_dataset, ConversionRun};
pub use detect::{default_out_path, detect_image, BoxRecord, ImageDetections};
