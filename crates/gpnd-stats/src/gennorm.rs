// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;

use crate::simplex::{SimplexOptions, nelder_mead};
use crate::special::ln_gamma;

const FIT_INITIAL_GUESS: [f64; 3] = [2.0, 0.0, 1.0];
const FIT_TOLERANCE: f64 = 1e-12;

/// Generalized normal (exponential power) distribution.
///
/// Density: `beta / (2 * scale * Gamma(1/beta)) * exp(-(|x - loc| / scale)^beta)`.
/// `beta == 2` recovers a Gaussian shape, `beta == 1` a Laplace shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenNormal {
    beta: f64,
    loc: f64,
    scale: f64,
}

impl GenNormal {
    pub fn new(beta: f64, loc: f64, scale: f64) -> Result<Self, GpndError> {
        if !(beta.is_finite() && loc.is_finite() && scale.is_finite()) {
            return Err(GpndError::invalid_input(format!(
                "generalized normal parameters must be finite; beta={beta} loc={loc} scale={scale}"
            )));
        }
        if beta <= 0.0 || scale <= 0.0 {
            return Err(GpndError::invalid_input(format!(
                "generalized normal requires beta > 0 and scale > 0; beta={beta} scale={scale}"
            )));
        }
        Ok(Self { beta, loc, scale })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn loc(&self) -> f64 {
        self.loc
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        ln_pdf_unchecked(self.beta, self.loc, self.scale, x)
    }

    /// Density at `x`, computed as `exp(ln_pdf)`.
    ///
    /// Far in the tails the exponential underflows to exactly zero, and a
    /// later `ln` of that zero yields negative infinity. The scorer relies
    /// on that path to trigger its clamp, so the underflow is intentional.
    pub fn pdf(&self, x: f64) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// Maximum-likelihood fit of all three parameters.
    ///
    /// Runs a simplex search on the negative log-likelihood from the fixed
    /// starting point (2, 0, 1) with very tight tolerances, mirroring the
    /// common reference fitting routine. The best vertex is accepted even
    /// when the tolerance test never passes within the budget.
    pub fn fit(data: &[f64]) -> Result<Self, GpndError> {
        if data.is_empty() {
            return Err(GpndError::invalid_input(
                "generalized normal fit requires at least one observation",
            ));
        }
        for (idx, &x) in data.iter().enumerate() {
            if !x.is_finite() {
                return Err(GpndError::invalid_input(format!(
                    "observations must be finite; data[{idx}]={x}"
                )));
            }
        }

        let negative_log_likelihood = |params: &[f64]| -> f64 {
            let (beta, loc, scale) = (params[0], params[1], params[2]);
            if beta <= 0.0 || scale <= 0.0 {
                return f64::INFINITY;
            }
            let mut total = 0.0f64;
            for &x in data {
                let ll = ln_pdf_unchecked(beta, loc, scale, x);
                if !ll.is_finite() {
                    return f64::INFINITY;
                }
                total -= ll;
            }
            total
        };

        let options = SimplexOptions::for_dimension(FIT_INITIAL_GUESS.len())
            .with_tolerances(FIT_TOLERANCE, FIT_TOLERANCE);
        let result = nelder_mead(negative_log_likelihood, &FIT_INITIAL_GUESS, &options)?;

        if !result.fval.is_finite() {
            return Err(GpndError::numerical_issue(
                "generalized normal fit failed to find a finite likelihood",
            ));
        }
        Self::new(result.x[0], result.x[1], result.x[2])
    }
}

fn ln_pdf_unchecked(beta: f64, loc: f64, scale: f64, x: f64) -> f64 {
    let standardized = ((x - loc) / scale).abs();
    beta.ln() - 2.0f64.ln() - scale.ln() - ln_gamma(1.0 / beta) - standardized.powf(beta)
}
