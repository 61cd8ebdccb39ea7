// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::{ExecutionContext, GpndError};
use gpnd_score::ScoredDataset;
use gpnd_stats::{SimplexOptions, nelder_mead};

use crate::metrics::{confusion_counts, weighted_score};

// Fixed optimizer start and budgets for the F1 search.
const CALIBRATION_START: [f64; 2] = [0.0, 0.2];
const CALIBRATION_XATOL: f64 = 0.01;
const CALIBRATION_FATOL: f64 = 1e-4;
const CALIBRATION_MAX_EVALUATIONS: usize = 10_000;

/// Calibrated decision parameters and the F1 they achieved on the
/// validation mixture.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThresholdCalibration {
    pub alpha: f64,
    pub threshold: f64,
    pub best_f1: f64,
}

/// Searches `(threshold, alpha)` for maximum F1 on a scored validation
/// mixture.
///
/// Derivative-free simplex search on the negated F1, starting from
/// `(0, 0.2)`. The objective is piecewise constant, so the search settles
/// on a local optimum; that is accepted behavior, not a failure. The best
/// F1 found is reported through telemetry as `best_f1`.
pub fn calibrate(
    ctx: &ExecutionContext<'_>,
    scored: &ScoredDataset,
) -> Result<ThresholdCalibration, GpndError> {
    if scored.components.is_empty() {
        return Err(GpndError::invalid_input(
            "calibration requires at least one scored sample",
        ));
    }
    if scored.components.len() != scored.is_inlier.len() {
        return Err(GpndError::invalid_input(format!(
            "scored components and ground truth differ in length: {} vs {}",
            scored.components.len(),
            scored.is_inlier.len()
        )));
    }
    ctx.check_cancelled()?;

    let f1_at = |threshold: f64, alpha: f64| -> Result<f64, GpndError> {
        let scores: Vec<f64> = scored
            .components
            .iter()
            .map(|c| weighted_score(c, alpha))
            .collect();
        Ok(confusion_counts(scores.as_slice(), scored.is_inlier.as_slice(), threshold)?.f1())
    };

    let options = SimplexOptions::for_dimension(CALIBRATION_START.len())
        .with_tolerances(CALIBRATION_XATOL, CALIBRATION_FATOL)
        .with_max_evaluations(CALIBRATION_MAX_EVALUATIONS);
    let result = nelder_mead(
        |x| match f1_at(x[0], x[1]) {
            Ok(f1) => -f1,
            Err(_) => f64::INFINITY,
        },
        &CALIBRATION_START,
        &options,
    )?;

    let threshold = result.x[0];
    let alpha = result.x[1];
    let best_f1 = f1_at(threshold, alpha)?;
    ctx.record_scalar("best_f1", best_f1);

    Ok(ThresholdCalibration {
        alpha,
        threshold,
        best_f1,
    })
}
