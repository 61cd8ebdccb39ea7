// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_core::GpndError;

/// Minimum density substituted for empty or out-of-range histogram regions
/// so that downstream log terms stay finite.
pub const DENSITY_FLOOR: f64 = 1e-308;

/// Empirical probability density of reconstruction distances.
///
/// Built once from the reference (inlier) set; read-only afterward.
/// Bin edges are equally spaced over the observed range and densities are
/// normalized so the histogram integrates to one.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceHistogram {
    bin_edges: Vec<f64>,
    densities: Vec<f64>,
}

impl DistanceHistogram {
    /// Fits a `bins`-bin normalized histogram over `distances`.
    pub fn fit(distances: &[f64], bins: usize) -> Result<Self, GpndError> {
        if bins == 0 {
            return Err(GpndError::invalid_input("histogram requires bins >= 1"));
        }
        if distances.is_empty() {
            return Err(GpndError::invalid_input(
                "histogram requires at least one distance",
            ));
        }
        for (idx, &d) in distances.iter().enumerate() {
            if !d.is_finite() {
                return Err(GpndError::invalid_input(format!(
                    "distances must be finite; distances[{idx}]={d}"
                )));
            }
        }

        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for &d in distances {
            low = low.min(d);
            high = high.max(d);
        }
        // Degenerate range: widen by one half on each side, as numpy does.
        if low == high {
            low -= 0.5;
            high += 0.5;
        }

        let bin_width = (high - low) / bins as f64;
        let mut counts = vec![0u64; bins];
        for &d in distances {
            let mut idx = ((d - low) / bin_width) as usize;
            // The top edge belongs to the last bin.
            if idx >= bins {
                idx = bins - 1;
            }
            counts[idx] += 1;
        }

        let norm = 1.0 / (distances.len() as f64 * bin_width);
        let densities = counts.iter().map(|&c| c as f64 * norm).collect();
        let bin_edges = (0..=bins).map(|i| low + i as f64 * bin_width).collect();

        Ok(Self {
            bin_edges,
            densities,
        })
    }

    pub fn bin_edges(&self) -> &[f64] {
        self.bin_edges.as_slice()
    }

    pub fn densities(&self) -> &[f64] {
        self.densities.as_slice()
    }

    /// Queries the empirical density at `x`.
    ///
    /// Semantics, in order:
    /// - strictly inside `(edges[0], edges[last])`: density of the
    ///   containing half-open bin, floored at `DENSITY_FLOOR`;
    /// - `x < edges[0]`: linear ramp `densities[0] * x / edges[0]`,
    ///   floored. When `edges[0] == 0` the division is undefined; the
    ///   IEEE result (infinity or NaN) resolves through the floor
    ///   comparison rather than raising. Known latent defect, preserved.
    /// - everything else (including `x == edges[0]`): exactly the floor.
    pub fn r_pdf(&self, x: f64) -> f64 {
        let first = self.bin_edges[0];
        let last = self.bin_edges[self.bin_edges.len() - 1];

        if first < x && x < last {
            let i = self
                .bin_edges
                .partition_point(|edge| *edge <= x)
                .saturating_sub(1);
            return self.densities[i.min(self.densities.len() - 1)].max(DENSITY_FLOOR);
        }
        if x < first {
            return (self.densities[0] * x / first).max(DENSITY_FLOOR);
        }
        DENSITY_FLOOR
    }
}
