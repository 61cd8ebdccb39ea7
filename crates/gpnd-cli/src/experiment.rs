// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gpnd_core::{
    Dataset, ExecutionContext, GpndError, LabeledImage, PipelineConfig, RunDiagnostics,
    StableRng,
};
use gpnd_eval::{EvaluationReport, ThresholdCalibration, calibrate, evaluate_scores};
use gpnd_model::{load_model_pair, read_npy_file, write_sample_grid_pgm};
use gpnd_score::{NoveltyScorer, fit_reference_statistics};

/// One experiment: a fold assignment, the inlier class set, and where the
/// checkpoints and data folds live.
#[derive(Clone, Debug)]
pub struct ExperimentSpec {
    /// Fold held out as the test partition; the next fold is validation.
    pub folding_id: usize,
    /// Labels treated as known/inlier.
    pub inlier_classes: Vec<u32>,
    /// Class index baked into the checkpoint file names.
    pub checkpoint_class: u32,
    /// Total number of labels in the dataset.
    pub total_classes: u32,
    /// Scales the configured scoring batch size.
    pub batch_multiplier: usize,
    /// Number of data folds on disk.
    pub fold_count: usize,
    /// Directory holding `Gmodel_*`/`Emodel_*` checkpoints.
    pub model_dir: PathBuf,
    /// Directory holding `data_fold_<i>.npy` partitions.
    pub dataset_dir: PathBuf,
    /// Optional output path for the qualitative sample grid.
    pub sample_grid_path: Option<PathBuf>,
}

impl ExperimentSpec {
    fn validate(&self, config: &PipelineConfig) -> Result<(), GpndError> {
        if self.fold_count < 3 {
            return Err(GpndError::invalid_input(format!(
                "experiments need at least 3 folds (reference, validation, test); got {}",
                self.fold_count
            )));
        }
        if self.folding_id >= self.fold_count {
            return Err(GpndError::invalid_input(format!(
                "folding_id {} is out of range for {} folds",
                self.folding_id, self.fold_count
            )));
        }
        if self.inlier_classes.is_empty() {
            return Err(GpndError::invalid_input(
                "experiments require at least one inlier class",
            ));
        }
        for &class in &self.inlier_classes {
            if class >= self.total_classes {
                return Err(GpndError::invalid_input(format!(
                    "inlier class {class} is out of range for {} total classes",
                    self.total_classes
                )));
            }
        }
        if self.batch_multiplier == 0 {
            return Err(GpndError::invalid_input("batch_multiplier must be >= 1"));
        }
        config.validate()
    }
}

/// Everything one experiment produces: per-percentage calibrations and
/// reports, plus run diagnostics.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExperimentOutcome {
    pub calibrations: BTreeMap<u8, ThresholdCalibration>,
    pub results: BTreeMap<u8, EvaluationReport>,
    pub diagnostics: RunDiagnostics,
}

/// Runs the full pipeline for one fold/class assignment.
///
/// Strictly sequential stages: load the data folds and checkpoints, write
/// the sample grid, fit reference statistics on the inlier reference set,
/// then per configured outlier percentage synthesize the validation
/// mixture, calibrate `(threshold, alpha)`, and evaluate the calibrated
/// detector on the test mixture.
pub fn run_experiment(
    ctx: &ExecutionContext<'_>,
    spec: &ExperimentSpec,
    config: &PipelineConfig,
) -> Result<ExperimentOutcome, GpndError> {
    spec.validate(config)?;
    ctx.check_cancelled()?;

    let pixel_count = config.pixel_count();
    let mut diagnostics = RunDiagnostics {
        latent_size: Some(config.latent_size),
        pixel_count: Some(pixel_count),
        shuffle_seed: Some(config.shuffle_seed),
        ..RunDiagnostics::default()
    };
    if config.make_plots {
        diagnostics
            .notes
            .push("make_plots requested but no plotting backend is built in".to_string());
    }

    let (mut reference_set, validation_set, test_set) = load_partitions(spec, pixel_count)?;
    diagnostics.validation_set_size = Some(validation_set.len());
    diagnostics.test_set_size = Some(test_set.len());

    let mut rng = StableRng::new(config.shuffle_seed);
    reference_set.shuffle(&mut rng)?;

    let pair = load_model_pair(
        spec.model_dir.as_path(),
        spec.folding_id,
        spec.checkpoint_class,
        pixel_count,
        config.latent_size,
    )?;

    if let Some(grid_path) = spec.sample_grid_path.as_deref() {
        if config.image_channels != 1 {
            diagnostics.warnings.push(format!(
                "sample grid skipped: only single-channel tiles are renderable, config has {}",
                config.image_channels
            ));
        } else {
            write_sample_grid_pgm(grid_path, &pair.generator, &mut rng, config.image_size)?;
        }
    }

    let (stats, fit_summary) = fit_reference_statistics(
        ctx,
        &pair.encoder,
        &pair.generator,
        &reference_set,
        config,
    )?;
    diagnostics.fit_runtime_ms = Some(fit_summary.runtime_ms);
    diagnostics.notes.push(format!(
        "reference statistics fitted on {} inlier samples",
        fit_summary.sample_count
    ));

    let scoring_config = PipelineConfig {
        batch_size: config.batch_size * spec.batch_multiplier,
        ..config.clone()
    };
    let scorer = NoveltyScorer::new(&stats, &scoring_config)?;

    let mut calibrations = BTreeMap::new();
    let mut results = BTreeMap::new();
    for &percentage in &config.percentages {
        ctx.check_cancelled()?;

        let validation_mixture = validation_set.with_outlier_percentage(
            spec.inlier_classes.as_slice(),
            percentage,
            true,
            &mut rng,
        )?;
        let scored_validation = scorer.score_dataset(
            ctx,
            &pair.encoder,
            &pair.generator,
            &validation_mixture,
            spec.inlier_classes.as_slice(),
        )?;
        let calibration = calibrate(ctx, &scored_validation)?;

        let test_mixture = test_set.with_outlier_percentage(
            spec.inlier_classes.as_slice(),
            percentage,
            true,
            &mut rng,
        )?;
        let scored_test = scorer.score_dataset(
            ctx,
            &pair.encoder,
            &pair.generator,
            &test_mixture,
            spec.inlier_classes.as_slice(),
        )?;
        let report =
            evaluate_scores(&scored_test, calibration.alpha, calibration.threshold)?;

        calibrations.insert(percentage, calibration);
        results.insert(percentage, report);
    }

    Ok(ExperimentOutcome {
        calibrations,
        results,
        diagnostics,
    })
}

/// Splits the on-disk folds into (reference, validation, test).
///
/// The test partition is fold `folding_id`, validation the following fold
/// (wrapping), and the reference set is every remaining fold filtered
/// down to inlier classes only.
fn load_partitions(
    spec: &ExperimentSpec,
    pixel_count: usize,
) -> Result<(Dataset, Dataset, Dataset), GpndError> {
    let validation_fold = (spec.folding_id + 1) % spec.fold_count;

    let mut reference_samples = Vec::new();
    let mut validation = None;
    let mut test = None;
    for fold in 0..spec.fold_count {
        let dataset = load_fold_dataset(spec.dataset_dir.as_path(), fold, pixel_count)?;
        if fold == spec.folding_id {
            test = Some(dataset);
        } else if fold == validation_fold {
            validation = Some(dataset);
        } else {
            for sample in dataset.samples() {
                if spec.inlier_classes.contains(&sample.label) {
                    reference_samples.push(sample.clone());
                }
            }
        }
    }

    if reference_samples.is_empty() {
        return Err(GpndError::invalid_input(
            "reference folds contain no inlier samples",
        ));
    }
    let reference = Dataset::new(reference_samples, pixel_count)?;

    // Both are always assigned: folding_id and validation_fold are
    // distinct indices inside 0..fold_count for fold_count >= 3.
    let validation = validation.ok_or_else(|| {
        GpndError::invalid_input("validation fold selection failed")
    })?;
    let test =
        test.ok_or_else(|| GpndError::invalid_input("test fold selection failed"))?;
    Ok((reference, validation, test))
}

/// Reads `data_fold_<fold>.npy`: one row per sample, label in column 0,
/// flattened pixels after it.
pub fn load_fold_dataset(
    dir: &Path,
    fold: usize,
    pixel_count: usize,
) -> Result<Dataset, GpndError> {
    let path = dir.join(format!("data_fold_{fold}.npy"));
    let array = read_npy_file(path.as_path())?;
    if array.cols != pixel_count + 1 {
        return Err(GpndError::invalid_input(format!(
            "data fold '{}' has {} columns; expected label + {} pixels",
            path.display(),
            array.cols,
            pixel_count
        )));
    }

    let mut samples = Vec::with_capacity(array.rows);
    for (row_idx, row) in array.values.chunks_exact(array.cols).enumerate() {
        let raw_label = row[0];
        if !raw_label.is_finite() || raw_label < 0.0 || raw_label.fract() != 0.0 {
            return Err(GpndError::invalid_input(format!(
                "data fold '{}' row {row_idx} has invalid label {raw_label}",
                path.display()
            )));
        }
        samples.push(LabeledImage {
            label: raw_label as u32,
            pixels: row[1..].to_vec(),
        });
    }
    Dataset::new(samples, pixel_count)
}
