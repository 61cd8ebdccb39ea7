// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;
use gpnd_score::ScoreComponents;

/// F1 measure from raw counts; zero when there is nothing to score.
pub fn f1_from_counts(true_positives: u64, false_positives: u64, false_negatives: u64) -> f64 {
    let denominator = 2 * true_positives + false_positives + false_negatives;
    if denominator == 0 {
        return 0.0;
    }
    2.0 * true_positives as f64 / denominator as f64
}

/// Collapses a score tuple to a scalar: the mean of the components
/// weighted by `[1, 1, alpha, 1]`, with `alpha` on the power-law term.
pub fn weighted_score(components: &ScoreComponents, alpha: f64) -> f64 {
    (components.log_d
        + components.log_pz
        + alpha * components.log_pe_p1
        + components.log_pe_p2)
        / 4.0
}

/// Confusion counts for one `(threshold, alpha)` pair.
///
/// A sample is "positive" when its scalar score exceeds the threshold,
/// and the positive class is matched against the inlier ground truth.
/// High likelihood-style scores put inliers above the threshold, which is
/// what the calibrator's F1 search exploits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_negatives: u64,
}

impl ConfusionCounts {
    pub fn f1(&self) -> f64 {
        f1_from_counts(
            self.true_positives,
            self.false_positives,
            self.false_negatives,
        )
    }
}

pub fn confusion_counts(
    scores: &[f64],
    is_inlier: &[bool],
    threshold: f64,
) -> Result<ConfusionCounts, GpndError> {
    if scores.len() != is_inlier.len() {
        return Err(GpndError::invalid_input(format!(
            "scores and ground truth differ in length: {} vs {}",
            scores.len(),
            is_inlier.len()
        )));
    }

    let mut counts = ConfusionCounts::default();
    for (&score, &inlier) in scores.iter().zip(is_inlier.iter()) {
        let positive = score > threshold;
        match (positive, inlier) {
            (true, true) => counts.true_positives += 1,
            (true, false) => counts.false_positives += 1,
            (false, true) => counts.false_negatives += 1,
            (false, false) => counts.true_negatives += 1,
        }
    }
    Ok(counts)
}

/// Rank-based AUC of `scores` as a predictor of the inlier class, with
/// midrank tie handling.
pub fn rank_auc(scores: &[f64], is_inlier: &[bool]) -> Result<f64, GpndError> {
    if scores.len() != is_inlier.len() {
        return Err(GpndError::invalid_input(format!(
            "scores and ground truth differ in length: {} vs {}",
            scores.len(),
            is_inlier.len()
        )));
    }
    let positives = is_inlier.iter().filter(|&&v| v).count();
    let negatives = is_inlier.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(GpndError::invalid_input(
            "AUC requires both classes to be present",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Midranks over tied score runs, 1-based.
    let mut positive_rank_sum = 0.0f64;
    let mut idx = 0;
    while idx < order.len() {
        let mut run_end = idx + 1;
        while run_end < order.len()
            && scores[order[run_end]].total_cmp(&scores[order[idx]]).is_eq()
        {
            run_end += 1;
        }
        let midrank = (idx + 1 + run_end) as f64 / 2.0;
        for &sample in &order[idx..run_end] {
            if is_inlier[sample] {
                positive_rank_sum += midrank;
            }
        }
        idx = run_end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
