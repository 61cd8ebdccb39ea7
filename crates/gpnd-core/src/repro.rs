// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Reproducibility mode used to control determinism/performance trade-offs.
///
/// `Strict` selects compensated (Kahan) accumulation for distance sums so
/// results are invariant to value magnitude spread; `Balanced` uses plain
/// accumulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReproMode {
    Strict,
    #[default]
    Balanced,
    Fast,
}

/// Sum of squares of `values`, plain accumulation.
pub fn sum_of_squares(values: &[f32]) -> f64 {
    values.iter().map(|v| {
        let v = f64::from(*v);
        v * v
    }).sum()
}

/// Sum of squares of `values` with Kahan compensation.
pub fn sum_of_squares_kahan(values: &[f32]) -> f64 {
    let mut total = 0.0f64;
    let mut compensation = 0.0f64;
    for v in values {
        let v = f64::from(*v);
        let y = v * v - compensation;
        let t = total + y;
        compensation = (t - total) - y;
        total = t;
    }
    total
}

/// L2 distance between two equal-length pixel vectors.
///
/// Panics in debug builds on length mismatch; callers validate shapes at
/// the dataset boundary.
pub fn l2_distance(a: &[f32], b: &[f32], mode: ReproMode) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "l2_distance requires equal lengths");
    match mode {
        ReproMode::Strict => {
            let mut total = 0.0f64;
            let mut compensation = 0.0f64;
            for (lhs, rhs) in a.iter().zip(b.iter()) {
                let diff = f64::from(*lhs) - f64::from(*rhs);
                let y = diff * diff - compensation;
                let t = total + y;
                compensation = (t - total) - y;
                total = t;
            }
            total.sqrt()
        }
        ReproMode::Balanced | ReproMode::Fast => a
            .iter()
            .zip(b.iter())
            .map(|(lhs, rhs)| {
                let diff = f64::from(*lhs) - f64::from(*rhs);
                diff * diff
            })
            .sum::<f64>()
            .sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::{ReproMode, l2_distance, sum_of_squares, sum_of_squares_kahan};

    #[test]
    fn repro_mode_default_is_balanced() {
        assert_eq!(ReproMode::default(), ReproMode::Balanced);
    }

    #[test]
    fn repro_mode_serde_roundtrip() {
        for mode in [ReproMode::Strict, ReproMode::Balanced, ReproMode::Fast] {
            let encoded = serde_json::to_string(&mode).expect("repro mode should serialize");
            let decoded: ReproMode =
                serde_json::from_str(&encoded).expect("repro mode should deserialize");
            assert_eq!(decoded, mode);
        }
    }

    #[test]
    fn l2_distance_matches_hand_computed_value() {
        let a = [0.0f32, 3.0, 0.0];
        let b = [0.0f32, 0.0, 4.0];
        let got = l2_distance(&a, &b, ReproMode::Balanced);
        assert!((got - 5.0).abs() < 1e-12, "expected 5.0, got {got}");
    }

    #[test]
    fn strict_and_balanced_agree_on_well_conditioned_data() {
        let a: Vec<f32> = (0..64).map(|i| (i as f32) * 0.25).collect();
        let b: Vec<f32> = (0..64).map(|i| (i as f32) * 0.25 + 1.0).collect();
        let balanced = l2_distance(&a, &b, ReproMode::Balanced);
        let strict = l2_distance(&a, &b, ReproMode::Strict);
        assert!((balanced - strict).abs() < 1e-9);
    }

    #[test]
    fn kahan_sum_of_squares_matches_plain_on_small_inputs() {
        let values = [1.0f32, 2.0, 3.0];
        assert_eq!(sum_of_squares(&values), 14.0);
        assert_eq!(sum_of_squares_kahan(&values), 14.0);
    }
}
