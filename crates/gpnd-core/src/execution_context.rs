// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GpndError;
use crate::control::CancelToken;
use crate::observability::{ProgressSink, TelemetrySink};
use crate::repro::ReproMode;

/// Unified execution context passed through every pipeline stage.
///
/// The context is the explicit replacement for ambient state: the
/// reproducibility mode that components use for numeric accumulation, the
/// cancellation token polled inside batch loops, and optional progress and
/// telemetry sinks.
pub struct ExecutionContext<'a> {
    pub repro_mode: ReproMode,
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a dyn ProgressSink>,
    pub telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with safe defaults and no optional hooks.
    pub fn new() -> Self {
        Self {
            repro_mode: ReproMode::Balanced,
            cancel: None,
            progress: None,
            telemetry: None,
        }
    }

    /// Sets the reproducibility mode.
    pub fn with_repro_mode(mut self, repro_mode: ReproMode) -> Self {
        self.repro_mode = repro_mode;
        self
    }

    /// Sets the optional cancellation token.
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets an optional progress sink.
    pub fn with_progress_sink(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sets an optional telemetry sink.
    pub fn with_telemetry_sink(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Returns true when cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Returns a cancelled error when cancellation has been requested.
    pub fn check_cancelled(&self) -> Result<(), GpndError> {
        if self.is_cancelled() {
            return Err(GpndError::cancelled());
        }
        Ok(())
    }

    /// Checks cancellation every `every` iterations.
    ///
    /// When `every` is zero, it is treated as one (always poll).
    pub fn check_cancelled_every(&self, iteration: usize, every: usize) -> Result<(), GpndError> {
        let every = every.max(1);
        if iteration % every != 0 {
            return Ok(());
        }
        self.check_cancelled()
    }

    /// Emits clamped progress to the sink, if configured.
    pub fn report_progress(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }
        if let Some(sink) = self.progress {
            sink.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// Emits a scalar telemetry value to the sink, if configured.
    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if let Some(sink) = self.telemetry {
            sink.record_scalar(key, value);
        }
    }
}

impl Default for ExecutionContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionContext;
    use crate::control::CancelToken;
    use crate::observability::{ProgressSink, TelemetrySink};
    use crate::repro::ReproMode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockProgressSink {
        values: Mutex<Vec<f32>>,
    }

    impl ProgressSink for MockProgressSink {
        fn on_progress(&self, fraction: f32) {
            self.values
                .lock()
                .expect("progress mutex should lock")
                .push(fraction);
        }
    }

    #[derive(Default)]
    struct MockTelemetrySink {
        values: Mutex<Vec<(&'static str, f64)>>,
    }

    impl TelemetrySink for MockTelemetrySink {
        fn record_scalar(&self, key: &'static str, value: f64) {
            self.values
                .lock()
                .expect("telemetry mutex should lock")
                .push((key, value));
        }
    }

    #[test]
    fn new_sets_expected_defaults() {
        let ctx = ExecutionContext::new();
        assert_eq!(ctx.repro_mode, ReproMode::Balanced);
        assert!(ctx.cancel.is_none());
        assert!(ctx.progress.is_none());
        assert!(ctx.telemetry.is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn builder_methods_set_requested_fields() {
        let cancel = CancelToken::new();
        let progress = MockProgressSink::default();
        let telemetry = MockTelemetrySink::default();

        let ctx = ExecutionContext::new()
            .with_repro_mode(ReproMode::Strict)
            .with_cancel(&cancel)
            .with_progress_sink(&progress)
            .with_telemetry_sink(&telemetry);

        assert_eq!(ctx.repro_mode, ReproMode::Strict);
        assert!(ctx.cancel.is_some_and(|token| std::ptr::eq(token, &cancel)));
        assert!(ctx.progress.is_some());
        assert!(ctx.telemetry.is_some());
    }

    #[test]
    fn check_cancelled_returns_cancelled_error_when_requested() {
        let cancel = CancelToken::new();
        let ctx = ExecutionContext::new().with_cancel(&cancel);

        assert!(ctx.check_cancelled().is_ok());
        cancel.cancel();

        let err = ctx
            .check_cancelled()
            .expect_err("cancelled token should return an error");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn check_cancelled_every_polls_on_cadence() {
        let cancel = CancelToken::new();
        let ctx = ExecutionContext::new().with_cancel(&cancel);
        cancel.cancel();

        assert!(ctx.check_cancelled_every(1, 4).is_ok());
        let err = ctx
            .check_cancelled_every(4, 4)
            .expect_err("cadence hit should observe cancellation");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn check_cancelled_every_zero_interval_is_treated_as_always_poll() {
        let cancel = CancelToken::new();
        let ctx = ExecutionContext::new().with_cancel(&cancel);
        cancel.cancel();
        assert!(ctx.check_cancelled_every(3, 0).is_err());
    }

    #[test]
    fn report_progress_clamps_and_ignores_non_finite_values() {
        let progress = MockProgressSink::default();
        let ctx = ExecutionContext::new().with_progress_sink(&progress);

        ctx.report_progress(-0.2);
        ctx.report_progress(0.25);
        ctx.report_progress(1.2);
        ctx.report_progress(f32::NAN);

        let got = progress
            .values
            .lock()
            .expect("progress values should lock")
            .clone();
        assert_eq!(got, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn record_scalar_writes_to_telemetry_sink_when_present() {
        let telemetry = MockTelemetrySink::default();
        let ctx = ExecutionContext::new().with_telemetry_sink(&telemetry);

        ctx.record_scalar("best_f1", 0.93);
        ctx.record_scalar("fit_runtime_ms", 120.0);

        let got = telemetry
            .values
            .lock()
            .expect("telemetry values should lock")
            .clone();
        assert_eq!(got, vec![("best_f1", 0.93), ("fit_runtime_ms", 120.0)]);
    }

    #[test]
    fn report_progress_and_record_scalar_are_noops_without_sinks() {
        let ctx = ExecutionContext::new();
        ctx.report_progress(0.5);
        ctx.record_scalar("best_f1", 1.0);
    }
}
