// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use gpnd_core::GpndError;

use crate::affine::{AffineEncoder, AffineGenerator, AffineMap};
use crate::npy::read_npy_file;

/// Encoder/generator pair restored from a checkpoint directory.
#[derive(Clone, Debug)]
pub struct ModelPair {
    pub encoder: AffineEncoder,
    pub generator: AffineGenerator,
}

/// Checkpoint file names for one fold and one inlier class.
///
/// Returns `(generator, encoder)` paths following the
/// `Gmodel_<fold>_<class>.npy` / `Emodel_<fold>_<class>.npy` convention.
pub fn checkpoint_paths(dir: &Path, fold: usize, inlier_class: u32) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("Gmodel_{fold}_{inlier_class}.npy")),
        dir.join(format!("Emodel_{fold}_{inlier_class}.npy")),
    )
}

/// Loads the encoder/generator pair for one fold and inlier class.
///
/// The generator checkpoint must be `(pixel_count, latent_size + 1)` and
/// the encoder checkpoint `(latent_size, pixel_count + 1)`, each with the
/// bias in the trailing column.
pub fn load_model_pair(
    dir: &Path,
    fold: usize,
    inlier_class: u32,
    pixel_count: usize,
    latent_size: usize,
) -> Result<ModelPair, GpndError> {
    let (generator_path, encoder_path) = checkpoint_paths(dir, fold, inlier_class);

    let generator_array = read_npy_file(generator_path.as_path())?;
    if (generator_array.rows, generator_array.cols) != (pixel_count, latent_size + 1) {
        return Err(GpndError::invalid_input(format!(
            "generator checkpoint '{}' has shape ({}, {}); expected ({}, {})",
            generator_path.display(),
            generator_array.rows,
            generator_array.cols,
            pixel_count,
            latent_size + 1
        )));
    }

    let encoder_array = read_npy_file(encoder_path.as_path())?;
    if (encoder_array.rows, encoder_array.cols) != (latent_size, pixel_count + 1) {
        return Err(GpndError::invalid_input(format!(
            "encoder checkpoint '{}' has shape ({}, {}); expected ({}, {})",
            encoder_path.display(),
            encoder_array.rows,
            encoder_array.cols,
            latent_size,
            pixel_count + 1
        )));
    }

    let generator = AffineGenerator::new(AffineMap::from_augmented(
        generator_array.values.as_slice(),
        latent_size,
        pixel_count,
    )?);
    let encoder = AffineEncoder::new(AffineMap::from_augmented(
        encoder_array.values.as_slice(),
        pixel_count,
        latent_size,
    )?);

    Ok(ModelPair { encoder, generator })
}
