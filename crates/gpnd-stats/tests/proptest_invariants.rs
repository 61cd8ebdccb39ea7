// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_stats::{DENSITY_FLOOR, DistanceHistogram, GenNormal, SimplexOptions, nelder_mead};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const REL_TOL: f64 = 1e-9;
const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn relative_close(actual: f64, expected: f64) -> bool {
    let diff = (actual - expected).abs();
    diff <= REL_TOL * (1.0 + expected.abs())
}

fn distances_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..500.0, 2..200)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn r_pdf_is_always_at_least_the_density_floor(
        distances in distances_strategy(),
        query in -1000.0f64..1000.0,
    ) {
        let histogram = DistanceHistogram::fit(&distances, 30)
            .expect("generated distances should always fit");
        let density = histogram.r_pdf(query);
        prop_assert!(density >= DENSITY_FLOOR);
        prop_assert!(density.is_finite());
    }

    #[test]
    fn r_pdf_is_exactly_the_floor_at_or_beyond_the_top_edge(
        distances in distances_strategy(),
        overshoot in 0.0f64..100.0,
    ) {
        let histogram = DistanceHistogram::fit(&distances, 30)
            .expect("generated distances should always fit");
        let top = histogram.bin_edges()[histogram.bin_edges().len() - 1];
        prop_assert_eq!(histogram.r_pdf(top + overshoot), DENSITY_FLOOR);
    }

    #[test]
    fn r_pdf_ramp_is_monotone_below_the_first_edge(
        distances in prop::collection::vec(10.0f64..500.0, 2..200),
        fraction_low in 0.05f64..0.5,
        fraction_high in 0.5f64..0.95,
    ) {
        let histogram = DistanceHistogram::fit(&distances, 30)
            .expect("generated distances should always fit");
        let first = histogram.bin_edges()[0];
        prop_assert!(first > 0.0);

        let low = histogram.r_pdf(first * fraction_low);
        let high = histogram.r_pdf(first * fraction_high);
        prop_assert!(low <= high + REL_TOL);
    }

    #[test]
    fn histogram_integrates_to_one(distances in distances_strategy()) {
        let histogram = DistanceHistogram::fit(&distances, 30)
            .expect("generated distances should always fit");
        let bin_width = histogram.bin_edges()[1] - histogram.bin_edges()[0];
        let integral: f64 = histogram.densities().iter().map(|d| d * bin_width).sum();
        prop_assert!(relative_close(integral, 1.0));
    }

    #[test]
    fn gennorm_ln_pdf_is_finite_and_peaks_at_loc(
        beta in 0.5f64..4.0,
        loc in -10.0f64..10.0,
        scale in 0.1f64..10.0,
        offset in 0.01f64..50.0,
    ) {
        let dist = GenNormal::new(beta, loc, scale).expect("valid parameters");
        let center = dist.ln_pdf(loc);
        let off_center = dist.ln_pdf(loc + offset);
        prop_assert!(center.is_finite());
        prop_assert!(off_center.is_finite());
        prop_assert!(center >= off_center);
    }

    #[test]
    fn simplex_minimum_of_quadratic_lands_near_target(
        target_x in -50.0f64..50.0,
        target_y in -50.0f64..50.0,
    ) {
        let result = nelder_mead(
            |p| (p[0] - target_x).powi(2) + (p[1] - target_y).powi(2),
            &[0.0, 0.0],
            &SimplexOptions {
                xatol: 1e-8,
                fatol: 1e-8,
                max_evaluations: 5000,
                max_iterations: 5000,
            },
        )
        .expect("minimization should succeed");
        prop_assert!((result.x[0] - target_x).abs() < 1e-3);
        prop_assert!((result.x[1] - target_y).abs() < 1e-3);
    }
}
