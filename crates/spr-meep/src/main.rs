//! spr-meep: CLI tool that writes (and optionally runs) the MEEP SPR simulation

use anyhow::{Context, Result};
use clap::Parser;
use spr_meep::config::SourceKind;
use spr_meep::{
    generate_meep_script, run_solver, DeviceConfig, MeepSimulation, PlotOutput, RunCondition,
    RunnerOptions, ScriptOptions,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spr-meep")]
#[command(about = "Surface plasmon resonance of a MoS2 / Ag-nanodisk device with MEEP")]
#[command(version)]
struct Args {
    /// Device parameters (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output Python file
    #[arg(short, long, default_value = "surface_plasmon_mos2.py")]
    output: PathBuf,

    /// Resolution in pixels per µm
    #[arg(long)]
    resolution: Option<f64>,

    /// Run length in MEEP time units for both passes
    #[arg(long)]
    until: Option<f64>,

    /// Number of flux monitor frequencies
    #[arg(long)]
    nfreq: Option<usize>,

    /// Continuous source frequency (1/µm)
    #[arg(long, conflicts_with = "pulsed")]
    source_frequency: Option<f64>,

    /// Use a Gaussian pulse spanning the monitor band instead of a CW source
    #[arg(long)]
    pulsed: bool,

    /// Save plots as PNG files here instead of opening windows
    #[arg(long)]
    plot_dir: Option<PathBuf>,

    /// Have the script write the incident flux spectrum to this JSON file
    #[arg(long)]
    results: Option<PathBuf>,

    /// Run the generated script after writing it
    #[arg(long)]
    run: bool,

    /// Python interpreter with MEEP installed
    #[arg(long, default_value = "python3")]
    python: String,

    /// Print the effective device parameters as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Print generated script to stdout instead of file
    #[arg(long, conflicts_with = "run")]
    stdout: bool,
}

fn apply_overrides(config: &mut DeviceConfig, args: &Args) {
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(until) = args.until {
        config.run = RunCondition::Until(until);
    }
    if let Some(nfreq) = args.nfreq {
        config.monitor.nfreq = nfreq;
    }
    if let Some(frequency) = args.source_frequency {
        config.source.kind = SourceKind::Continuous { frequency };
    }
    if args.pulsed {
        config.source.kind = SourceKind::Gaussian;
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("Failed to load device config: {:?}", path))?,
        None => DeviceConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let simulation = MeepSimulation::from_config(&config).context("Invalid device parameters")?;
    info!(
        "Cell {:.4} x {:.4} µm at {} px/µm",
        simulation.cell_size.x, simulation.cell_size.y, simulation.resolution
    );

    let options = ScriptOptions {
        plot_output: match &args.plot_dir {
            Some(dir) => PlotOutput::SaveTo(dir.clone()),
            None => PlotOutput::Interactive,
        },
        results_path: args.results.clone(),
        ..ScriptOptions::default()
    };

    let script = generate_meep_script(&simulation, &options).context("Script generation failed")?;

    if args.stdout {
        println!("{}", script);
        return Ok(());
    }

    fs::write(&args.output, &script)
        .with_context(|| format!("Failed to write output file: {:?}", args.output))?;
    info!("Generated MEEP script: {:?}", args.output);

    if args.run {
        let runner = RunnerOptions {
            python: args.python.clone(),
            results_path: args.results.clone(),
            ..RunnerOptions::default()
        };
        let run = run_solver(&args.output, &runner).context("MEEP run failed")?;
        info!("Elapsed wall-clock time: {:.2} s", run.elapsed.as_secs_f64());

        if let Some(spectrum) = run.spectrum {
            println!("{:>12} {:>12} {:>14}", "freq", "wvl (um)", "input flux");
            for ((f, wvl), flux) in spectrum
                .freqs
                .iter()
                .zip(spectrum.wavelengths())
                .zip(&spectrum.input_flux)
            {
                println!("{:>12.6} {:>12.6} {:>14.6e}", f, wvl, flux);
            }
            if let Some((f, flux)) = spectrum.peak() {
                info!("Peak incident flux {:.4e} at {:.4} µm", flux, 1.0 / f);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "spr-meep",
            "--resolution",
            "30",
            "--until",
            "100",
            "--nfreq",
            "11",
            "--pulsed",
        ]);
        let mut config = DeviceConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.resolution, 30.0);
        assert_eq!(config.run, RunCondition::Until(100.0));
        assert_eq!(config.monitor.nfreq, 11);
        assert_eq!(config.source.kind, SourceKind::Gaussian);
    }

    #[test]
    fn test_no_overrides_keep_defaults() {
        let args = Args::parse_from(["spr-meep"]);
        let mut config = DeviceConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config, DeviceConfig::default());
        assert_eq!(args.output, PathBuf::from("surface_plasmon_mos2.py"));
    }

    #[test]
    fn test_conflicting_source_flags() {
        let result = Args::try_parse_from(["spr-meep", "--pulsed", "--source-frequency", "2.0"]);
        assert!(result.is_err());
    }
}
