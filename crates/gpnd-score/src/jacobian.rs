// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;
use gpnd_model::Generator;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Log-volume of the generator's local Jacobian for every sample in a
/// batch.
///
/// Forward finite differences: for each latent dimension the whole batch
/// gets one extra generator pass with that dimension shifted by `epsilon`,
/// so the cost is `latent_size + 0` additional passes regardless of batch
/// size. Per sample, the `(pixels, latent_size)` difference matrix goes
/// through an economy SVD and contributes
/// `logD = -sum(ln |1/s_k|)` over its singular values.
///
/// `baseline` must hold the unperturbed reconstructions for the same
/// latent batch. Singular values of exactly zero propagate through IEEE
/// arithmetic (the term becomes negative infinity) rather than erroring.
pub fn batch_log_volumes(
    generator: &dyn Generator,
    latents: &[f32],
    baseline: &[f32],
    epsilon: f64,
) -> Result<Vec<f64>, GpndError> {
    let latent_size = generator.latent_size();
    let pixel_count = generator.output_size();
    if latent_size == 0 || pixel_count == 0 {
        return Err(GpndError::invalid_input(
            "jacobian estimation requires non-zero model dimensions",
        ));
    }
    if latents.len() % latent_size != 0 {
        return Err(GpndError::invalid_input(format!(
            "latent buffer length {} is not a multiple of latent size {latent_size}",
            latents.len()
        )));
    }
    let count = latents.len() / latent_size;
    if baseline.len() != count * pixel_count {
        return Err(GpndError::invalid_input(format!(
            "baseline buffer length {} does not match {count} samples of {pixel_count} pixels",
            baseline.len()
        )));
    }
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(GpndError::invalid_input(format!(
            "jacobian epsilon must be finite and > 0; got {epsilon}"
        )));
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    // One generator pass per latent dimension; differences stored
    // column-block by dimension.
    let step = epsilon as f32;
    let mut columns = Vec::with_capacity(latent_size);
    let mut perturbed = latents.to_vec();
    for dim in 0..latent_size {
        for sample_idx in 0..count {
            perturbed[sample_idx * latent_size + dim] += step;
        }
        let shifted = generator.generate_batch(perturbed.as_slice())?;
        let mut diffs = vec![0.0f64; count * pixel_count];
        for (diff, (&base, &shift)) in diffs
            .iter_mut()
            .zip(baseline.iter().zip(shifted.iter()))
        {
            *diff = (f64::from(base) - f64::from(shift)) / epsilon;
        }
        columns.push(diffs);
        for sample_idx in 0..count {
            perturbed[sample_idx * latent_size + dim] = latents[sample_idx * latent_size + dim];
        }
    }

    let log_volumes = (0..count)
        .into_par_iter()
        .map(|sample_idx| {
            let jacobian = DMatrix::from_fn(pixel_count, latent_size, |row, col| {
                columns[col][sample_idx * pixel_count + row]
            });
            let singular_values = jacobian.singular_values();
            -singular_values
                .iter()
                .map(|s| (1.0 / s).abs().ln())
                .sum::<f64>()
        })
        .collect();

    Ok(log_volumes)
}

#[cfg(test)]
mod tests {
    use gpnd_model::{AffineGenerator, AffineMap, Generator};

    use super::batch_log_volumes;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    fn generator_from_weights(weights: Vec<f32>, latent: usize, pixels: usize) -> AffineGenerator {
        let map = AffineMap::new(weights, vec![0.0; pixels], latent, pixels)
            .expect("test map should be valid");
        AffineGenerator::new(map)
    }

    #[test]
    fn affine_generator_log_volume_is_sum_of_log_singular_values() {
        // W = [[2, 0], [0, 5], [0, 0]]: singular values {5, 2}.
        let generator = generator_from_weights(vec![2.0, 0.0, 0.0, 5.0, 0.0, 0.0], 2, 3);
        let latents = vec![0.3f32, -0.7];
        let baseline = generator
            .generate_batch(latents.as_slice())
            .expect("baseline pass should succeed");

        let log_volumes = batch_log_volumes(&generator, &latents, &baseline, 1e-3)
            .expect("jacobian should estimate");
        assert_eq!(log_volumes.len(), 1);
        // Forward differences through f32 generator passes carry ~1e-5 error.
        assert_close(log_volumes[0], (5.0f64 * 2.0).ln(), 1e-3);
    }

    #[test]
    fn every_sample_in_a_batch_gets_its_own_log_volume() {
        let generator = generator_from_weights(vec![1.0, 0.0, 0.0, 3.0, 1.0, 1.0], 2, 3);
        let latents = vec![0.0f32, 0.0, 1.0, -1.0, 5.0, 5.0];
        let baseline = generator
            .generate_batch(latents.as_slice())
            .expect("baseline pass should succeed");

        let log_volumes = batch_log_volumes(&generator, &latents, &baseline, 1e-3)
            .expect("jacobian should estimate");
        assert_eq!(log_volumes.len(), 3);
        // An affine map has the same Jacobian everywhere, up to f32
        // finite-difference noise.
        assert_close(log_volumes[1], log_volumes[0], 1e-3);
        assert_close(log_volumes[2], log_volumes[0], 1e-3);
    }

    #[test]
    fn results_are_deterministic_across_runs() {
        let generator =
            generator_from_weights(vec![0.5, 1.5, -2.0, 0.25, 1.0, -1.0, 3.0, 0.0], 2, 4);
        let latents = vec![0.1f32, 0.2, -0.3, 0.4];
        let baseline = generator
            .generate_batch(latents.as_slice())
            .expect("baseline pass should succeed");

        let first = batch_log_volumes(&generator, &latents, &baseline, 1e-3)
            .expect("first run should succeed");
        let second = batch_log_volumes(&generator, &latents, &baseline, 1e-3)
            .expect("second run should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_mismatched_buffers_and_bad_epsilon() {
        let generator = generator_from_weights(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0], 2, 3);
        let latents = vec![0.0f32, 0.0];
        let baseline = vec![0.0f32; 3];

        assert!(batch_log_volumes(&generator, &[0.0], &baseline, 1e-3).is_err());
        assert!(batch_log_volumes(&generator, &latents, &[0.0], 1e-3).is_err());
        assert!(batch_log_volumes(&generator, &latents, &baseline, 0.0).is_err());
        assert!(batch_log_volumes(&generator, &latents, &baseline, f64::NAN).is_err());
    }

    #[test]
    fn empty_batch_yields_empty_output() {
        let generator = generator_from_weights(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0], 2, 3);
        let log_volumes = batch_log_volumes(&generator, &[], &[], 1e-3)
            .expect("empty batch should be fine");
        assert!(log_volumes.is_empty());
    }
}
