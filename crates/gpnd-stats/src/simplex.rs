// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;

/// Options for the Nelder-Mead simplex minimizer.
///
/// Tolerance semantics follow the common reference implementation:
/// convergence requires the maximum coordinate spread of the simplex to be
/// within `xatol` AND the maximum objective spread within `fatol`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplexOptions {
    pub xatol: f64,
    pub fatol: f64,
    pub max_evaluations: usize,
    pub max_iterations: usize,
}

impl SimplexOptions {
    /// Default budgets scaled by dimensionality, 200 per dimension.
    pub fn for_dimension(dimension: usize) -> Self {
        Self {
            xatol: 1e-4,
            fatol: 1e-4,
            max_evaluations: dimension.max(1) * 200,
            max_iterations: dimension.max(1) * 200,
        }
    }

    pub fn with_tolerances(mut self, xatol: f64, fatol: f64) -> Self {
        self.xatol = xatol;
        self.fatol = fatol;
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }
}

/// Outcome of a simplex minimization.
///
/// `converged` reports whether the tolerance test passed before the
/// iteration/evaluation budget ran out; callers that accept best-effort
/// results (both fit paths here do) use `x` regardless.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplexResult {
    pub x: Vec<f64>,
    pub fval: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

// Initial simplex displacement factors.
const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

/// Minimizes `objective` from `x0` with a derivative-free simplex search.
///
/// Deterministic given identical inputs. Non-finite objective values are
/// ordered as worst, so the search moves away from invalid regions without
/// failing.
pub fn nelder_mead<F>(
    mut objective: F,
    x0: &[f64],
    options: &SimplexOptions,
) -> Result<SimplexResult, GpndError>
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(GpndError::invalid_input(
            "nelder_mead requires at least one parameter",
        ));
    }
    for (idx, value) in x0.iter().enumerate() {
        if !value.is_finite() {
            return Err(GpndError::invalid_input(format!(
                "initial guess must be finite; x0[{idx}]={value}"
            )));
        }
    }

    let mut evaluations = 0usize;
    let mut eval = |point: &[f64], evaluations: &mut usize| -> f64 {
        *evaluations += 1;
        let value = objective(point);
        if value.is_nan() { f64::INFINITY } else { value }
    };

    // Vertex 0 is x0; vertex k+1 displaces coordinate k.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for k in 0..n {
        let mut vertex = x0.to_vec();
        if vertex[k] != 0.0 {
            vertex[k] *= 1.0 + NONZERO_DELTA;
        } else {
            vertex[k] = ZERO_DELTA;
        }
        simplex.push(vertex);
    }

    let mut values: Vec<f64> = simplex
        .iter()
        .map(|vertex| eval(vertex, &mut evaluations))
        .collect();
    sort_simplex(&mut simplex, &mut values);

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < options.max_iterations && evaluations < options.max_evaluations {
        if within_tolerance(&simplex, &values, options) {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = centroid_excluding_worst(&simplex);
        let worst = simplex[n].clone();
        let reflected = affine_combination(&centroid, &worst, 1.0 + REFLECTION, -REFLECTION);
        let reflected_value = eval(&reflected, &mut evaluations);

        if reflected_value < values[0] {
            let expanded = affine_combination(
                &centroid,
                &worst,
                1.0 + REFLECTION * EXPANSION,
                -REFLECTION * EXPANSION,
            );
            let expanded_value = eval(&expanded, &mut evaluations);
            if expanded_value < reflected_value {
                simplex[n] = expanded;
                values[n] = expanded_value;
            } else {
                simplex[n] = reflected;
                values[n] = reflected_value;
            }
        } else if reflected_value < values[n - 1] {
            simplex[n] = reflected;
            values[n] = reflected_value;
        } else {
            let shrink_needed = if reflected_value < values[n] {
                // Outside contraction.
                let contracted = affine_combination(
                    &centroid,
                    &worst,
                    1.0 + REFLECTION * CONTRACTION,
                    -REFLECTION * CONTRACTION,
                );
                let contracted_value = eval(&contracted, &mut evaluations);
                if contracted_value <= reflected_value {
                    simplex[n] = contracted;
                    values[n] = contracted_value;
                    false
                } else {
                    true
                }
            } else {
                // Inside contraction.
                let contracted =
                    affine_combination(&centroid, &worst, 1.0 - CONTRACTION, CONTRACTION);
                let contracted_value = eval(&contracted, &mut evaluations);
                if contracted_value < values[n] {
                    simplex[n] = contracted;
                    values[n] = contracted_value;
                    false
                } else {
                    true
                }
            };

            if shrink_needed {
                let best = simplex[0].clone();
                for vertex_idx in 1..=n {
                    for coord in 0..n {
                        simplex[vertex_idx][coord] =
                            best[coord] + SHRINK * (simplex[vertex_idx][coord] - best[coord]);
                    }
                    values[vertex_idx] = eval(&simplex[vertex_idx].clone(), &mut evaluations);
                }
            }
        }

        sort_simplex(&mut simplex, &mut values);
    }

    if !converged {
        converged = within_tolerance(&simplex, &values, options);
    }

    Ok(SimplexResult {
        x: simplex[0].clone(),
        fval: values[0],
        evaluations,
        iterations,
        converged,
    })
}

fn sort_simplex(simplex: &mut [Vec<f64>], values: &mut [f64]) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let reordered_simplex: Vec<Vec<f64>> = order.iter().map(|&idx| simplex[idx].clone()).collect();
    let reordered_values: Vec<f64> = order.iter().map(|&idx| values[idx]).collect();
    simplex.clone_from_slice(reordered_simplex.as_slice());
    values.copy_from_slice(reordered_values.as_slice());
}

fn within_tolerance(simplex: &[Vec<f64>], values: &[f64], options: &SimplexOptions) -> bool {
    let best = &simplex[0];
    let coordinate_spread = simplex[1..]
        .iter()
        .flat_map(|vertex| {
            vertex
                .iter()
                .zip(best.iter())
                .map(|(v, b)| (v - b).abs())
        })
        .fold(0.0f64, f64::max);
    let value_spread = values[1..]
        .iter()
        .map(|v| (v - values[0]).abs())
        .fold(0.0f64, f64::max);

    coordinate_spread <= options.xatol && value_spread <= options.fatol
}

fn centroid_excluding_worst(simplex: &[Vec<f64>]) -> Vec<f64> {
    let n = simplex.len() - 1;
    let mut centroid = vec![0.0f64; n];
    for vertex in &simplex[..n] {
        for (acc, coord) in centroid.iter_mut().zip(vertex.iter()) {
            *acc += coord;
        }
    }
    for acc in &mut centroid {
        *acc /= n as f64;
    }
    centroid
}

fn affine_combination(a: &[f64], b: &[f64], wa: f64, wb: f64) -> Vec<f64> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| wa * x + wb * y)
        .collect()
}
