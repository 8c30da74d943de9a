//! spr-meep: surface plasmon resonance runs of a MoS2 / Ag-nanodisk device in MEEP
//!
//! This crate provides:
//! - Device parameters (JSON) for a Si / SiO2 / MoS2 stack with a silver nanodisk array
//! - The layer stack and its cumulative-offset placement inside the cell
//! - A typed MEEP simulation description shared by the normalization and device runs
//! - Python script generation and a blocking driver for the MEEP interpreter
//!
//! Lengths are in µm, which is also the MEEP length unit.

pub mod codegen;
pub mod config;
pub mod error;
pub mod material;
pub mod meep;
pub mod runner;
pub mod stack;

pub use codegen::{generate_meep_script, PlotOutput, ScriptOptions};
pub use config::{DeviceConfig, RunCondition, SpectralBand};
pub use error::{SetupError, SolverError};
pub use material::{LibraryMaterial, Material, MaterialCatalog};
pub use meep::{MeepSimulation, RunKind};
pub use runner::{run_solver, FluxSpectrum, RunnerOptions, SolverRun};
pub use stack::{Layer, LayerStack};

use anyhow::Result;

/// Main entry point: build the simulation from parameters and render the script
pub fn generate(config: &DeviceConfig, options: &ScriptOptions) -> Result<String> {
    let simulation = MeepSimulation::from_config(config)?;
    let script = generate_meep_script(&simulation, options)?;
    Ok(script)
}

/// Convert a vacuum wavelength in µm to a MEEP frequency
pub fn wavelength_to_frequency(wavelength_um: f64) -> f64 {
    1.0 / wavelength_um
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_wavelength() {
        // 532 nm green pump
        let f = wavelength_to_frequency(0.532);
        assert!((f - 1.8797).abs() < 1e-4);
        assert!((f - 1.89).abs() < 0.02);
    }

    #[test]
    fn test_generate_default() {
        let script = generate(&DeviceConfig::default(), &ScriptOptions::default()).unwrap();
        assert!(script.starts_with("#!/usr/bin/env python3"));
    }

    #[test]
    fn test_generate_rejects_bad_config() {
        let mut config = DeviceConfig::default();
        config.resolution = 0.0;
        let err = generate(&config, &ScriptOptions::default()).unwrap_err();
        assert!(err.downcast_ref::<SetupError>().is_some());
    }
}
