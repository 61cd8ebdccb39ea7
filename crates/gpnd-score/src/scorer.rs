// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::time::Instant;

use gpnd_core::{Dataset, ExecutionContext, GpndError, PipelineConfig, l2_distance};
use gpnd_model::{Encoder, Generator};
use gpnd_stats::{DistanceHistogram, GenNormal, LOG_2PI, ln_gamma};

use crate::jacobian::batch_log_volumes;

/// Substituted latent log-density when the prior underflows to zero.
pub const LOG_PZ_FLOOR: f64 = -1000.0;

/// The four additive log-terms of the novelty score.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ScoreComponents {
    /// Jacobian log-volume of the generator at the sample's latent code.
    pub log_d: f64,
    /// Latent prior log-density, floored at exactly -1000 on underflow.
    pub log_pz: f64,
    /// Power-law residual term `logC - (N-1) ln(distance)`.
    pub log_pe_p1: f64,
    /// Empirical residual density term `ln(r_pdf(distance))`.
    pub log_pe_p2: f64,
}

/// Reference statistics fitted on inlier data: the empirical distance
/// density and one generalized-normal prior per latent dimension.
#[derive(Clone, Debug)]
pub struct ReferenceStatistics {
    pub histogram: DistanceHistogram,
    pub priors: Vec<GenNormal>,
}

/// Bookkeeping from the statistics-extraction stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitSummary {
    pub runtime_ms: u64,
    pub sample_count: usize,
}

/// Score tuples plus the parallel inlier ground-truth vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredDataset {
    pub components: Vec<ScoreComponents>,
    pub is_inlier: Vec<bool>,
}

/// Fits the reference statistics over an inlier dataset.
///
/// One encoder and one generator pass per batch produce the
/// reconstruction distances and latent codes; the distance histogram and
/// the per-dimension priors are fitted from those. Runtime lands in the
/// returned summary and on telemetry as `fit_runtime_ms`.
pub fn fit_reference_statistics(
    ctx: &ExecutionContext<'_>,
    encoder: &dyn Encoder,
    generator: &dyn Generator,
    dataset: &Dataset,
    config: &PipelineConfig,
) -> Result<(ReferenceStatistics, FitSummary), GpndError> {
    check_model_shapes(encoder, generator, dataset.pixel_count(), config.latent_size)?;
    if dataset.is_empty() {
        return Err(GpndError::invalid_input(
            "reference statistics require a non-empty dataset",
        ));
    }

    let started = Instant::now();
    let latent_size = config.latent_size;
    let mut distances = Vec::with_capacity(dataset.len());
    let mut latent_columns = vec![Vec::with_capacity(dataset.len()); latent_size];

    let batch_total = dataset.len().div_ceil(config.batch_size);
    for (batch_idx, batch) in dataset.batches(config.batch_size).enumerate() {
        ctx.check_cancelled()?;

        let pixels = pack_pixels(batch.iter().map(|s| s.pixels.as_slice()));
        let latents = encoder.encode_batch(pixels.as_slice())?;
        let reconstructions = generator.generate_batch(latents.as_slice())?;

        for (sample_idx, sample) in batch.iter().enumerate() {
            let recon = &reconstructions
                [sample_idx * dataset.pixel_count()..(sample_idx + 1) * dataset.pixel_count()];
            distances.push(l2_distance(
                sample.pixels.as_slice(),
                recon,
                ctx.repro_mode,
            ));
            let z = &latents[sample_idx * latent_size..(sample_idx + 1) * latent_size];
            for (dim, &value) in z.iter().enumerate() {
                latent_columns[dim].push(f64::from(value));
            }
        }
        ctx.report_progress((batch_idx + 1) as f32 / batch_total as f32);
    }

    let histogram = DistanceHistogram::fit(distances.as_slice(), config.histogram_bins)?;
    let priors = latent_columns
        .iter()
        .map(|column| GenNormal::fit(column.as_slice()))
        .collect::<Result<Vec<_>, _>>()?;

    let runtime_ms = started.elapsed().as_millis() as u64;
    ctx.record_scalar("fit_runtime_ms", runtime_ms as f64);

    Ok((
        ReferenceStatistics { histogram, priors },
        FitSummary {
            runtime_ms,
            sample_count: dataset.len(),
        },
    ))
}

/// Computes the four-component novelty score over labeled datasets.
pub struct NoveltyScorer<'a> {
    stats: &'a ReferenceStatistics,
    log_c: f64,
    residual_dims: usize,
    latent_size: usize,
    batch_size: usize,
    epsilon: f64,
}

impl<'a> NoveltyScorer<'a> {
    pub fn new(
        stats: &'a ReferenceStatistics,
        config: &PipelineConfig,
    ) -> Result<Self, GpndError> {
        if stats.priors.len() != config.latent_size {
            return Err(GpndError::invalid_input(format!(
                "reference statistics carry {} priors but latent_size is {}",
                stats.priors.len(),
                config.latent_size
            )));
        }
        let residual_dims = config.residual_dims();
        if residual_dims == 0 {
            return Err(GpndError::invalid_input(
                "scoring requires latent_size strictly below the pixel count",
            ));
        }

        let half_n = residual_dims as f64 / 2.0;
        let log_c = ln_gamma(half_n) - half_n * LOG_2PI;

        Ok(Self {
            stats,
            log_c,
            residual_dims,
            latent_size: config.latent_size,
            batch_size: config.batch_size,
            epsilon: config.jacobian_epsilon,
        })
    }

    /// The constant term of the power-law residual density.
    pub fn log_c(&self) -> f64 {
        self.log_c
    }

    /// Scores every sample in `dataset` and records whether its label is
    /// one of `inlier_classes`.
    pub fn score_dataset(
        &self,
        ctx: &ExecutionContext<'_>,
        encoder: &dyn Encoder,
        generator: &dyn Generator,
        dataset: &Dataset,
        inlier_classes: &[u32],
    ) -> Result<ScoredDataset, GpndError> {
        check_model_shapes(encoder, generator, dataset.pixel_count(), self.latent_size)?;

        let pixel_count = dataset.pixel_count();
        let mut components = Vec::with_capacity(dataset.len());
        let mut is_inlier = Vec::with_capacity(dataset.len());

        let batch_total = dataset.len().div_ceil(self.batch_size).max(1);
        for (batch_idx, batch) in dataset.batches(self.batch_size).enumerate() {
            ctx.check_cancelled()?;

            let pixels = pack_pixels(batch.iter().map(|s| s.pixels.as_slice()));
            let latents = encoder.encode_batch(pixels.as_slice())?;
            let reconstructions = generator.generate_batch(latents.as_slice())?;
            let log_volumes = batch_log_volumes(
                generator,
                latents.as_slice(),
                reconstructions.as_slice(),
                self.epsilon,
            )?;

            for (sample_idx, sample) in batch.iter().enumerate() {
                let recon =
                    &reconstructions[sample_idx * pixel_count..(sample_idx + 1) * pixel_count];
                let distance =
                    l2_distance(sample.pixels.as_slice(), recon, ctx.repro_mode);
                let z = &latents
                    [sample_idx * self.latent_size..(sample_idx + 1) * self.latent_size];

                components.push(ScoreComponents {
                    log_d: log_volumes[sample_idx],
                    log_pz: self.latent_log_density(z),
                    log_pe_p1: self.log_c
                        - (self.residual_dims as f64 - 1.0) * distance.ln(),
                    log_pe_p2: self.stats.histogram.r_pdf(distance).ln(),
                });
                is_inlier.push(inlier_classes.contains(&sample.label));
            }
            ctx.report_progress((batch_idx + 1) as f32 / batch_total as f32);
        }

        Ok(ScoredDataset {
            components,
            is_inlier,
        })
    }

    /// Sum of per-dimension prior log-densities, evaluated through the
    /// density itself so deep-tail underflow reaches negative infinity and
    /// trips the floor.
    fn latent_log_density(&self, z: &[f32]) -> f64 {
        let mut total = 0.0f64;
        for (prior, &value) in self.stats.priors.iter().zip(z.iter()) {
            total += prior.pdf(f64::from(value)).ln();
        }
        if total.is_finite() { total } else { LOG_PZ_FLOOR }
    }
}

fn check_model_shapes(
    encoder: &dyn Encoder,
    generator: &dyn Generator,
    pixel_count: usize,
    latent_size: usize,
) -> Result<(), GpndError> {
    if encoder.input_size() != pixel_count {
        return Err(GpndError::invalid_input(format!(
            "encoder expects {} pixels but the dataset has {}",
            encoder.input_size(),
            pixel_count
        )));
    }
    if encoder.latent_size() != latent_size {
        return Err(GpndError::invalid_input(format!(
            "encoder produces {} latent dims but the configuration says {}",
            encoder.latent_size(),
            latent_size
        )));
    }
    if generator.latent_size() != latent_size || generator.output_size() != pixel_count {
        return Err(GpndError::invalid_input(format!(
            "generator maps {} -> {} but the pipeline needs {} -> {}",
            generator.latent_size(),
            generator.output_size(),
            latent_size,
            pixel_count
        )));
    }
    Ok(())
}

fn pack_pixels<'s>(samples: impl Iterator<Item = &'s [f32]>) -> Vec<f32> {
    let mut packed = Vec::new();
    for pixels in samples {
        packed.extend_from_slice(pixels);
    }
    packed
}
