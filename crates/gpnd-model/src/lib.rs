// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Encoder/generator abstraction for the novelty pipeline.
//!
//! The scoring stages only see the [`Encoder`] and [`Generator`] traits;
//! the concrete models here are dense affine maps restored from `.npy`
//! checkpoints. A qualitative sample grid (PGM) rounds out the surface.

mod affine;
mod checkpoint;
mod model;
mod npy;
mod sample_grid;

pub use affine::{AffineEncoder, AffineGenerator, AffineMap};
pub use checkpoint::{ModelPair, checkpoint_paths, load_model_pair};
pub use model::{Encoder, Generator};
pub use npy::{NpyArray, parse_npy_bytes, read_npy_file};
pub use sample_grid::{GRID_DIM, render_sample_grid, write_sample_grid_pgm};
