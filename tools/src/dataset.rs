//! Whole-dataset conversion driven by [`DatasetSettings`].

use cli_support::config::DatasetSettings;
use face_dataset::{
    convert_split, validate_summary, write_dataset_config, ConvertOptions, DatasetResult,
    ValidationOutcome, ValidationReport, ValidationThresholds, WiderSplit,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct ConversionRun {
    pub outcome: ValidationOutcome,
    pub reports: Vec<ValidationReport>,
    /// `face.yaml`, when both a train and a val split were converted.
    pub config_path: Option<PathBuf>,
}

fn severity(outcome: ValidationOutcome) -> u8 {
    match outcome {
        ValidationOutcome::Pass => 0,
        ValidationOutcome::Warn => 1,
        ValidationOutcome::Fail => 2,
    }
}

/// Convert every configured split, check each against the thresholds
/// (environment overrides win), and write the dataset description.
pub fn convert_dataset(settings: &DatasetSettings) -> DatasetResult<ConversionRun> {
    let thresholds: ValidationThresholds =
        settings.thresholds.clone().or(ValidationThresholds::from_env());
    let opts = ConvertOptions {
        out_root: settings.out_root.clone(),
        min_box_px: settings.min_box_px,
        copy_images: settings.copy_images,
    };

    let mut reports = Vec::with_capacity(settings.splits.len());
    let mut outcome = ValidationOutcome::Pass;
    for name in &settings.splits {
        let split = WiderSplit::standard(&settings.wider_root, name);
        let summary = convert_split(&split, &opts)?;
        let report = validate_summary(summary, &thresholds);
        if severity(report.outcome) > severity(outcome) {
            outcome = report.outcome;
        }
        for reason in &report.reasons {
            tracing::warn!(split = %name, outcome = report.outcome.as_str(), "{reason}");
        }
        reports.push(report);
    }

    let has = |s: &str| settings.splits.iter().any(|n| n == s);
    let config_path = if has("train") && has("val") {
        Some(write_dataset_config(&settings.out_root, "train", "val")?)
    } else {
        tracing::warn!("train and val splits not both converted; dataset config not written");
        None
    };

    Ok(ConversionRun {
        outcome,
        reports,
        config_path,
    })
}
