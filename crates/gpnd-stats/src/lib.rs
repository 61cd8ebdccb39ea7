// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Statistical primitives behind the novelty score.
//!
//! Three pieces live here: the empirical distance density with its
//! out-of-range query rules, the generalized-normal latent prior with a
//! maximum-likelihood fit, and the derivative-free simplex minimizer that
//! both the prior fit and the downstream threshold calibration share.

mod gennorm;
mod histogram;
mod simplex;
mod special;

pub use gennorm::GenNormal;
pub use histogram::{DENSITY_FLOOR, DistanceHistogram};
pub use simplex::{SimplexOptions, SimplexResult, nelder_mead};
pub use special::{LOG_2PI, ln_gamma};
