// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GpndError;
use crate::rng::StableRng;

/// A single labeled image sample with flattened pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledImage {
    pub label: u32,
    pub pixels: Vec<f32>,
}

/// In-memory labeled dataset partition.
///
/// Samples are single-owner and immutable once loaded; shuffling and
/// mixture synthesis produce new orderings/sets deterministically from a
/// caller-supplied `StableRng`.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    samples: Vec<LabeledImage>,
    pixel_count: usize,
}

impl Dataset {
    /// Constructs a validated dataset; every sample must share the same
    /// pixel count.
    pub fn new(samples: Vec<LabeledImage>, pixel_count: usize) -> Result<Self, GpndError> {
        if pixel_count == 0 {
            return Err(GpndError::invalid_input("pixel_count must be >= 1"));
        }
        for (idx, sample) in samples.iter().enumerate() {
            if sample.pixels.len() != pixel_count {
                return Err(GpndError::invalid_input(format!(
                    "sample {idx} has {} pixels, expected {pixel_count}",
                    sample.pixels.len()
                )));
            }
        }
        Ok(Self {
            samples,
            pixel_count,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn samples(&self) -> &[LabeledImage] {
        self.samples.as_slice()
    }

    /// Deterministic in-place shuffle.
    pub fn shuffle(&mut self, rng: &mut StableRng) -> Result<(), GpndError> {
        rng.shuffle(self.samples.as_mut_slice())
    }

    /// Iterates over contiguous batches of at most `batch_size` samples.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[LabeledImage]> {
        self.samples.chunks(batch_size.max(1))
    }

    /// Synthesizes a mixture containing `percentage` percent outliers
    /// (labels outside `inlier_classes`).
    ///
    /// With `conservative` set, outliers are never replicated: when too
    /// few distinct outliers exist, inliers are trimmed instead, which
    /// yields a smaller but harder mixture. Without it, outliers are
    /// repeated cyclically until the requested share is reached.
    pub fn with_outlier_percentage(
        &self,
        inlier_classes: &[u32],
        percentage: u8,
        conservative: bool,
        rng: &mut StableRng,
    ) -> Result<Self, GpndError> {
        if percentage == 0 || percentage >= 100 {
            return Err(GpndError::invalid_input(format!(
                "outlier percentage must be in 1..=99; got {percentage}"
            )));
        }

        let mut inliers = Vec::new();
        let mut outliers = Vec::new();
        for sample in &self.samples {
            if inlier_classes.contains(&sample.label) {
                inliers.push(sample.clone());
            } else {
                outliers.push(sample.clone());
            }
        }
        if inliers.is_empty() {
            return Err(GpndError::invalid_input(
                "mixture synthesis requires at least one inlier sample",
            ));
        }
        if outliers.is_empty() {
            return Err(GpndError::invalid_input(
                "mixture synthesis requires at least one outlier sample",
            ));
        }

        rng.shuffle(inliers.as_mut_slice())?;
        rng.shuffle(outliers.as_mut_slice())?;

        let p = usize::from(percentage);
        let target_outliers = inliers.len() * p / (100 - p);

        let mut mixture = Vec::new();
        if outliers.len() >= target_outliers {
            outliers.truncate(target_outliers.max(1));
            mixture.extend(inliers);
            mixture.extend(outliers);
        } else if conservative {
            // Keep the outliers we have and trim inliers to hit the share.
            let target_inliers = (outliers.len() * (100 - p) / p).max(1);
            inliers.truncate(target_inliers);
            mixture.extend(inliers);
            mixture.extend(outliers);
        } else {
            let available = outliers.len();
            for idx in 0..target_outliers {
                mixture.push(outliers[idx % available].clone());
            }
            mixture.extend(inliers);
        }

        rng.shuffle(mixture.as_mut_slice())?;
        Self::new(mixture, self.pixel_count)
    }
}
