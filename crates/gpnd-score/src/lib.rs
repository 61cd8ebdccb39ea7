// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Novelty scoring.
//!
//! The score of a sample is four additive log-terms: the generator's
//! Jacobian log-volume at the sample's latent code, the latent prior
//! log-density, a power-law residual term, and the empirical residual
//! density. Reference statistics are fitted once on inlier data and then
//! applied to validation and test mixtures.

mod jacobian;
mod scorer;

pub use jacobian::batch_log_volumes;
pub use scorer::{
    FitSummary, LOG_PZ_FLOOR, NoveltyScorer, ReferenceStatistics, ScoreComponents,
    ScoredDataset, fit_reference_statistics,
};
