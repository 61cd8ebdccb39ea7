// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Diagnostics schema version for experiment run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from one experiment run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunDiagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    /// Wall-clock time spent fitting reference statistics.
    pub fit_runtime_ms: Option<u64>,
    pub validation_set_size: Option<usize>,
    pub test_set_size: Option<usize>,
    pub latent_size: Option<usize>,
    pub pixel_count: Option<usize>,
    pub shuffle_seed: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for RunDiagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            fit_runtime_ms: None,
            validation_set_size: None,
            test_set_size: None,
            latent_size: None,
            pixel_count: None,
            shuffle_seed: None,
            notes: vec![],
            warnings: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, RunDiagnostics};

    #[test]
    fn default_sets_schema_and_engine_version() {
        let diagnostics = RunDiagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn serde_roundtrip_preserves_all_fields() {
        let diagnostics = RunDiagnostics {
            fit_runtime_ms: Some(250),
            validation_set_size: Some(1_024),
            test_set_size: Some(2_048),
            latent_size: Some(32),
            pixel_count: Some(1_024),
            shuffle_seed: Some(7),
            notes: vec!["make_plots requested but no plotting backend".to_string()],
            warnings: vec!["gennorm fit hit evaluation budget".to_string()],
            ..RunDiagnostics::default()
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: RunDiagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
