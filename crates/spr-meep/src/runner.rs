//! Invoke the Python/MEEP interpreter on a generated script
//!
//! The call blocks until the solver exits. There is no timeout and no retry:
//! a failed run is reported to the caller as is.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Interpreter with `meep` importable
    pub python: String,
    /// Extra arguments placed before the script path (e.g. `-u`)
    pub interpreter_args: Vec<String>,
    /// Results file the script was generated to write, if any
    pub results_path: Option<PathBuf>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            interpreter_args: Vec::new(),
            results_path: None,
        }
    }
}

/// Incident flux spectrum recorded by the normalization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxSpectrum {
    /// Frequencies in MEEP units (1/µm)
    pub freqs: Vec<f64>,
    pub input_flux: Vec<f64>,
    /// Wall-clock time measured inside the script
    pub elapsed_s: f64,
}

impl FluxSpectrum {
    pub fn from_json(json: &str) -> Result<Self, SolverError> {
        let spectrum: Self =
            serde_json::from_str(json).map_err(|e| SolverError::Malformed(e.to_string()))?;

        if spectrum.freqs.len() != spectrum.input_flux.len() {
            return Err(SolverError::Malformed(format!(
                "{} frequencies but {} flux values",
                spectrum.freqs.len(),
                spectrum.input_flux.len()
            )));
        }
        if spectrum.freqs.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(SolverError::Malformed("non-positive frequency".to_string()));
        }

        Ok(spectrum)
    }

    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let json = fs::read_to_string(path).map_err(|source| SolverError::Results {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Vacuum wavelengths in µm, matching `freqs`
    pub fn wavelengths(&self) -> Vec<f64> {
        self.freqs.iter().map(|f| 1.0 / f).collect()
    }

    /// (frequency, flux) of the strongest bin
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.freqs
            .iter()
            .copied()
            .zip(self.input_flux.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Outcome of one solver invocation
#[derive(Debug, Clone)]
pub struct SolverRun {
    pub elapsed: Duration,
    pub spectrum: Option<FluxSpectrum>,
}

/// Run `script` with the configured interpreter and wait for it to finish
pub fn run_solver(script: &Path, options: &RunnerOptions) -> Result<SolverRun, SolverError> {
    tracing::info!("Running {} {:?}", options.python, script);

    let start = Instant::now();
    let status = Command::new(&options.python)
        .args(&options.interpreter_args)
        .arg(script)
        .status()
        .map_err(|source| SolverError::Spawn {
            program: options.python.clone(),
            source,
        })?;
    let elapsed = start.elapsed();

    if !status.success() {
        return Err(SolverError::Failed {
            code: status.code(),
        });
    }

    tracing::info!("Solver finished in {:.2} s", elapsed.as_secs_f64());

    let spectrum = match &options.results_path {
        Some(path) => Some(FluxSpectrum::load(path)?),
        None => None,
    };

    Ok(SolverRun { elapsed, spectrum })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spectrum_peak_and_wavelengths() {
        let spectrum = FluxSpectrum::from_json(
            r#"{"freqs": [2.0, 2.5], "input_flux": [0.4, 0.9], "elapsed_s": 12.5}"#,
        )
        .unwrap();

        assert_eq!(spectrum.wavelengths(), vec![0.5, 0.4]);
        assert_eq!(spectrum.peak(), Some((2.5, 0.9)));
    }

    #[test]
    fn test_spectrum_length_mismatch() {
        let err = FluxSpectrum::from_json(
            r#"{"freqs": [2.0, 2.5], "input_flux": [0.4], "elapsed_s": 1.0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::Malformed(_)));
    }

    #[test]
    fn test_empty_spectrum_has_no_peak() {
        let spectrum =
            FluxSpectrum::from_json(r#"{"freqs": [], "input_flux": [], "elapsed_s": 0.0}"#).unwrap();
        assert_eq!(spectrum.peak(), None);
    }

    #[test]
    fn test_missing_interpreter() {
        let options = RunnerOptions {
            python: "definitely-not-a-python-binary".to_string(),
            ..RunnerOptions::default()
        };
        let err = run_solver(Path::new("script.py"), &options).unwrap_err();
        assert!(matches!(err, SolverError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_run_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        fs::write(&script, "exit 3\n").unwrap();

        let options = RunnerOptions {
            python: "sh".to_string(),
            ..RunnerOptions::default()
        };
        let err = run_solver(&script, &options).unwrap_err();
        assert!(matches!(err, SolverError::Failed { code: Some(3) }));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_reads_results() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("flux.json");
        let script = dir.path().join("ok.sh");
        fs::write(
            &script,
            format!(
                "printf '%s' '{{\"freqs\":[1.8,2.2],\"input_flux\":[3.0,1.0],\"elapsed_s\":0.1}}' > '{}'\n",
                results.display()
            ),
        )
        .unwrap();

        let options = RunnerOptions {
            python: "sh".to_string(),
            interpreter_args: Vec::new(),
            results_path: Some(results),
        };
        let run = run_solver(&script, &options).unwrap();
        let spectrum = run.spectrum.unwrap();

        assert_eq!(spectrum.freqs, vec![1.8, 2.2]);
        assert_eq!(spectrum.peak(), Some((1.8, 3.0)));
    }
}
