//! Error types for simulation setup and solver invocation

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while building or checking the simulation description
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("wavelength band is empty: wvl_min = {wvl_min} µm, wvl_max = {wvl_max} µm")]
    InvalidBand { wvl_min: f64, wvl_max: f64 },

    #[error("nanodisk width {width} µm exceeds its period {period} µm")]
    DiskWiderThanPeriod { width: f64, period: f64 },

    #[error("flux monitor needs at least one frequency bin")]
    NoFluxBins,

    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    #[error("cell height {actual} µm does not match stack + padding + PML = {expected} µm")]
    CellHeightMismatch { expected: f64, actual: f64 },

    #[error("layers '{below}' and '{above}' are not contiguous (offset {offset:e} µm)")]
    LayerGap {
        below: String,
        above: String,
        offset: f64,
    },

    #[error("failed to read config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON")]
    Parse(#[from] serde_json::Error),
}

/// Problems running the external solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to launch {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver exited with {}", describe_exit(.code))]
    Failed { code: Option<i32> },

    #[error("failed to read flux results {path:?}")]
    Results {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed flux results: {0}")]
    Malformed(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message() {
        let err = SolverError::Failed { code: Some(2) };
        assert_eq!(err.to_string(), "solver exited with status 2");

        let err = SolverError::Failed { code: None };
        assert!(err.to_string().contains("signal"));
    }
}
