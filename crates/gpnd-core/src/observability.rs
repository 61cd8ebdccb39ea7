// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Receives coarse progress fractions in `[0, 1]` from long-running stages.
pub trait ProgressSink: Sync {
    fn on_progress(&self, fraction: f32);
}

/// Receives scalar diagnostics (calibrated F1, stage timings) keyed by a
/// stable name.
pub trait TelemetrySink: Sync {
    fn record_scalar(&self, key: &'static str, value: f64);
}
