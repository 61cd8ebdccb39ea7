// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub const LOG_2PI: f64 = 1.8378770664093453;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_7e-7,
];

/// Natural log of the gamma function via the Lanczos approximation.
pub fn ln_gamma(z: f64) -> f64 {
    debug_assert!(
        z.is_finite() && z > 0.0,
        "ln_gamma requires z > 0 and finite"
    );

    // Avoid reflection-instability for tiny positive z where sin(pi*z) can underflow.
    // ln Gamma(z) = -ln(z) + O(z) as z -> 0+.
    if z < 1e-8 {
        return -z.ln();
    }

    if z < 0.5 {
        let sin_term = (std::f64::consts::PI * z).sin().abs();
        return std::f64::consts::PI.ln() - sin_term.ln() - ln_gamma(1.0 - z);
    }

    let shifted = z - 1.0;
    let mut x = LANCZOS_COEFFICIENTS[0];
    for (idx, coefficient) in LANCZOS_COEFFICIENTS.iter().copied().enumerate().skip(1) {
        x += coefficient / (shifted + idx as f64);
    }

    let t = shifted + LANCZOS_G + 0.5;
    0.5 * LOG_2PI + (shifted + 0.5) * t.ln() - t + x.ln()
}

#[cfg(test)]
mod tests {
    use super::{LOG_2PI, ln_gamma};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    #[test]
    fn ln_gamma_matches_known_values() {
        assert_close(ln_gamma(1.0), 0.0, 1e-14);
        assert_close(ln_gamma(0.5), 0.5 * std::f64::consts::PI.ln(), 1e-12);
        assert_close(ln_gamma(5.0), 24.0_f64.ln(), 1e-12);
        let tiny = 1.0e-320;
        assert!(ln_gamma(tiny).is_finite());
        assert_close(ln_gamma(tiny), -tiny.ln(), 1e-10);
    }

    #[test]
    fn ln_gamma_handles_large_half_integer_arguments() {
        // Gamma(n + 1/2) = (2n)! sqrt(pi) / (4^n n!), checked at n = 496.
        // The scorer's logC uses exactly this shape of argument.
        let n = 496usize;
        let direct = ln_gamma(n as f64 + 0.5);
        let factorial_form = (2..=2 * n).map(|v| (v as f64).ln()).sum::<f64>()
            + 0.5 * std::f64::consts::PI.ln()
            - (n as f64) * 4.0f64.ln()
            - (2..=n).map(|v| (v as f64).ln()).sum::<f64>();
        assert_close(direct, factorial_form, 1e-8);
    }

    #[test]
    fn log_2pi_constant_matches_ln() {
        assert_close(LOG_2PI, (2.0 * std::f64::consts::PI).ln(), 1e-15);
    }
}
