// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for the GPND novelty-detection pipeline.
//!
//! This crate holds the pieces every stage needs: the error taxonomy, the
//! frozen pipeline configuration, the execution context with cancellation
//! and observability hooks, the deterministic RNG, labeled datasets with
//! outlier-mixture synthesis, and run diagnostics.

mod config;
mod control;
mod dataset;
mod error;
mod execution_context;
mod observability;
mod repro;
mod rng;

pub mod diagnostics;

pub use config::PipelineConfig;
pub use control::CancelToken;
pub use dataset::{Dataset, LabeledImage};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, RunDiagnostics};
pub use error::GpndError;
pub use execution_context::ExecutionContext;
pub use observability::{ProgressSink, TelemetrySink};
pub use repro::{ReproMode, l2_distance, sum_of_squares, sum_of_squares_kahan};
pub use rng::StableRng;
