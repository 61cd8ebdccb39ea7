// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Experiment orchestration for GPND novelty detection.
//!
//! The pipeline loads data folds and a trained encoder/generator
//! checkpoint pair, fits reference statistics on inlier folds, calibrates
//! the decision rule on a validation mixture, and evaluates it on the
//! test mixture. The `gpnd` binary wraps [`run_experiment`] behind a
//! flag-driven command surface.

mod experiment;

pub use experiment::{
    ExperimentOutcome, ExperimentSpec, load_fold_dataset, run_experiment,
};
