//! Face dataset tooling: WIDER FACE ground truth -> YOLO label layout,
//! conversion checks, and the external training invocation.

pub mod convert;
pub mod train;
pub mod types;
pub mod validation;
pub mod wider;

pub use convert::{convert_split, flatten_name, write_dataset_config, ConvertOptions};
pub use train::{TrainCommand, TrainSettings, DEFAULT_TRAIN_TEMPLATE};
pub use types::{
    ConversionSummary, DatasetError, DatasetResult, ValidationOutcome, ValidationReport,
    ValidationThresholds,
};
pub use validation::validate_summary;
pub use wider::{load_wider_gt, parse_wider_gt, WiderBox, WiderEntry, WiderSplit};
