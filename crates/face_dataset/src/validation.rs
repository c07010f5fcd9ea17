//! Conversion quality checks.

use crate::types::{ConversionSummary, ValidationOutcome, ValidationReport, ValidationThresholds};

fn apply_thresholds(
    label: &str,
    count: usize,
    ratio: f32,
    max_count: Option<usize>,
    max_ratio: Option<f32>,
    outcome: &mut ValidationOutcome,
    reasons: &mut Vec<String>,
) {
    if let Some(max) = max_count {
        if count > max {
            *outcome = ValidationOutcome::Fail;
            reasons.push(format!("{label}: {count} exceeds max {max}"));
        }
    }
    if let Some(max_r) = max_ratio {
        if ratio > max_r {
            *outcome = ValidationOutcome::Fail;
            reasons.push(format!("{label}: ratio {ratio:.3} exceeds max {max_r:.3}"));
        }
    }
    if count > 0 {
        if *outcome == ValidationOutcome::Pass {
            *outcome = ValidationOutcome::Warn;
        }
        reasons.push(format!("{label}: {count} observed"));
    }
}

/// Missing and empty images are measured against listed images, skipped
/// boxes against all boxes seen.
pub fn validate_summary(
    summary: ConversionSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let images = summary.images.max(1) as f32;
    let boxes_seen = (summary.boxes + summary.skipped_boxes).max(1) as f32;

    let mut outcome = ValidationOutcome::Pass;
    let mut reasons = Vec::new();

    apply_thresholds(
        "missing images",
        summary.missing_images,
        summary.missing_images as f32 / images,
        thresholds.max_missing,
        thresholds.max_missing_ratio,
        &mut outcome,
        &mut reasons,
    );
    apply_thresholds(
        "skipped boxes",
        summary.skipped_boxes,
        summary.skipped_boxes as f32 / boxes_seen,
        thresholds.max_skipped,
        thresholds.max_skipped_ratio,
        &mut outcome,
        &mut reasons,
    );
    apply_thresholds(
        "empty images",
        summary.empty_images,
        summary.empty_images as f32 / images,
        thresholds.max_empty,
        thresholds.max_empty_ratio,
        &mut outcome,
        &mut reasons,
    );

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}
