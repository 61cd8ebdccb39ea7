// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Calibration and evaluation.
//!
//! Score tuples collapse to a scalar via a weighted mean; the calibrator
//! searches `(threshold, alpha)` for maximum F1 on a validation mixture,
//! and the evaluator applies the calibrated pair to the test mixture and
//! reports precision, recall, F1, accuracy, and rank-based AUC.

mod calibrate;
mod metrics;
mod report;

pub use calibrate::{ThresholdCalibration, calibrate};
pub use metrics::{ConfusionCounts, confusion_counts, f1_from_counts, rank_auc, weighted_score};
pub use report::{EvaluationReport, evaluate_scores};
