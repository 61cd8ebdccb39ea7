// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;
use gpnd_score::ScoredDataset;

use crate::metrics::{ConfusionCounts, confusion_counts, rank_auc, weighted_score};

/// Final evaluation of a calibrated detector on a test mixture.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationReport {
    pub counts: ConfusionCounts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub auc: f64,
}

/// Applies `(alpha, threshold)` to a scored test mixture and assembles
/// the report. The scalar score rule is identical to calibration.
pub fn evaluate_scores(
    scored: &ScoredDataset,
    alpha: f64,
    threshold: f64,
) -> Result<EvaluationReport, GpndError> {
    if scored.components.is_empty() {
        return Err(GpndError::invalid_input(
            "evaluation requires at least one scored sample",
        ));
    }

    let scores: Vec<f64> = scored
        .components
        .iter()
        .map(|c| weighted_score(c, alpha))
        .collect();
    let counts = confusion_counts(scores.as_slice(), scored.is_inlier.as_slice(), threshold)?;
    let auc = rank_auc(scores.as_slice(), scored.is_inlier.as_slice())?;

    let predicted_positive = counts.true_positives + counts.false_positives;
    let actual_positive = counts.true_positives + counts.false_negatives;
    let total = predicted_positive + counts.false_negatives + counts.true_negatives;

    let precision = if predicted_positive == 0 {
        0.0
    } else {
        counts.true_positives as f64 / predicted_positive as f64
    };
    let recall = if actual_positive == 0 {
        0.0
    } else {
        counts.true_positives as f64 / actual_positive as f64
    };
    let accuracy =
        (counts.true_positives + counts.true_negatives) as f64 / total as f64;

    Ok(EvaluationReport {
        counts,
        precision,
        recall,
        f1: counts.f1(),
        accuracy,
        auc,
    })
}
