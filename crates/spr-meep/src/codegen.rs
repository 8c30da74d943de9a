//! Python code generation for the two-pass MEEP run

use std::path::PathBuf;

use anyhow::Result;
use minijinja::{context, Environment};
use nalgebra::Vector3;

use crate::config::RunCondition;
use crate::meep::{MeepSimulation, MeepSourceType, RunKind, Symmetry};

const SPR_TEMPLATE: &str = r##"#!/usr/bin/env python3
"""
Surface plasmon resonance of a MoS2 phototransistor: MoS2 on SiO2 / Si with a
silver nanodisk (AgND) array on top.
{{ header_comment }}

Generated: {{ timestamp }}
Stack (bottom to top): {{ stack_summary }}
"""

import json
import os
import time

import matplotlib
{% if save_plots %}
matplotlib.use("Agg")
{% endif %}
import matplotlib.pyplot as plt
import meep as mp
{% for name in library_imports %}
from meep.materials import {{ name }}
{% endfor %}

start_time = time.time()

# =============================================================================
# Simulation Parameters (lengths in um, frequencies in c/um)
# =============================================================================

RESOLUTION = {{ resolution }}

CELL_X = {{ cell_x }}
CELL_Y = {{ cell_y }}
PML_THICKNESS = {{ pml_thickness }}

FCEN = {{ fcen }}
DF = {{ df }}
NFREQ = {{ nfreq }}

{% if until %}
UNTIL = {{ until }}
{% else %}
DECAY_DT = {{ decay_dt }}
DECAY_BY = {{ decay_by }}
{% endif %}

{% if save_plots %}
PLOT_DIR = {{ plot_dir }}
os.makedirs(PLOT_DIR, exist_ok=True)
{% endif %}
{% if results_path %}
RESULTS_PATH = {{ results_path }}
{% endif %}

cell_size = mp.Vector3(CELL_X, CELL_Y, 0)
pml_layers = [mp.PML(thickness=PML_THICKNESS, direction={{ pml_axis }})]
k_point = mp.Vector3({{ k_point }})
symmetries = [{{ symmetries }}]
mon_pt = mp.Vector3({{ monitor_center }})


# =============================================================================
# Sources
# =============================================================================

def build_sources():
    """Excitation above the nanodisk array."""
    return [
{% for src in sources %}
        mp.Source(
{% if src.type == "continuous" %}
            mp.ContinuousSource(frequency={{ src.frequency }}),
{% else %}
            mp.GaussianSource({{ src.fcen }}, fwidth={{ src.fwidth }}),
{% endif %}
            component={{ src.component }},
            center=mp.Vector3({{ src.center }}),
            size=mp.Vector3({{ src.size }}),
        ),
{% endfor %}
    ]


# =============================================================================
# Geometry Definition
# =============================================================================

def build_geometry():
    """Layer stack, bottom to top."""
    return [
{% for geom in geometry %}
        # {{ geom.name }}
        mp.Block(
            material={{ geom.material }},
            size=mp.Vector3({{ geom.size }}),
            center=mp.Vector3({{ geom.center }}),
        ),
{% endfor %}
    ]


def build_simulation(geometry):
    return mp.Simulation(
        resolution=RESOLUTION,
        cell_size=cell_size,
        boundary_layers=pml_layers,
        geometry=geometry,
        k_point=k_point,
        sources=build_sources(),
        symmetries=symmetries,
{% if default_material %}
        default_material={{ default_material }},
{% endif %}
    )


def advance(sim):
{% if until %}
    sim.run(until=UNTIL)
{% else %}
    sim.run(until_after_sources=mp.stop_when_fields_decayed(DECAY_DT, {{ decay_component }}, mon_pt, DECAY_BY))
{% endif %}


def finish_plot(name):
{% if save_plots %}
    plt.savefig(os.path.join(PLOT_DIR, name + ".png"))
    plt.close()
{% else %}
    plt.show()
{% endif %}


# =============================================================================
# Normalization run: empty cell
# =============================================================================

sim = build_simulation({{ baseline_geometry }})

flux_mon = sim.add_flux(
    FCEN, DF, NFREQ, mp.FluxRegion(center=mon_pt, size=mp.Vector3({{ monitor_size }}))
)

f = plt.figure(dpi={{ layout_dpi }})
sim.plot2D(ax=f.gca())
finish_plot("baseline_layout")

advance(sim)

flux_freqs = mp.get_flux_freqs(flux_mon)
input_flux = mp.get_fluxes(flux_mon)

sim.reset_meep()


# =============================================================================
# Device run: layer stack and nanodisk
# =============================================================================

sim = build_simulation(build_geometry())

f2 = plt.figure(dpi={{ device_dpi }})
sim.plot2D(ax=f2.gca())
finish_plot("device_layout")

advance(sim)

plt.figure(dpi={{ field_dpi }})
sim.plot2D(fields={{ field_component }})
finish_plot("device_field")

elapsed_time = time.time() - start_time
print(f"Elapsed time: {elapsed_time:.2f} s")
{% if results_path %}

with open(RESULTS_PATH, "w") as fh:
    json.dump(
        {
            "freqs": list(flux_freqs),
            "input_flux": list(input_flux),
            "elapsed_s": elapsed_time,
        },
        fh,
    )
{% endif %}
"##;

/// Where the script sends its figures
#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutput {
    /// Interactive windows (`plt.show()`)
    Interactive,
    /// PNG files in a directory, using a non-interactive backend
    SaveTo(PathBuf),
}

/// Options that shape the generated script but not the physics
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub header_comment: String,
    pub plot_output: PlotOutput,
    /// JSON file receiving the baseline flux spectrum
    pub results_path: Option<PathBuf>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            header_comment: "Normalization run followed by the device run.".to_string(),
            plot_output: PlotOutput::Interactive,
            results_path: None,
        }
    }
}

/// Python float literal that round-trips exactly
fn py_float(value: f64) -> String {
    format!("{:?}", value)
}

fn py_vec(v: &Vector3<f64>) -> String {
    format!("{}, {}, {}", py_float(v.x), py_float(v.y), py_float(v.z))
}

/// JSON string escaping is valid Python string syntax
fn py_str(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Generate the MEEP Python script for both passes
pub fn generate_meep_script(sim: &MeepSimulation, options: &ScriptOptions) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("spr", SPR_TEMPLATE)?;

    let template = env.get_template("spr")?;

    let geometry: Vec<_> = sim
        .geometry_for(RunKind::Device)
        .iter()
        .map(|g| {
            serde_json::json!({
                "name": g.name,
                "material": g.material.to_meep_python(),
                "size": py_vec(&g.size),
                "center": py_vec(&g.center),
            })
        })
        .collect();

    let sources: Vec<_> = sim
        .sources
        .iter()
        .map(|s| {
            let (src_type, frequency, fcen, fwidth) = match s.source_type {
                MeepSourceType::ContinuousSource { frequency } => {
                    ("continuous", py_float(frequency), String::new(), String::new())
                }
                MeepSourceType::GaussianSource { fcen, fwidth } => {
                    ("gaussian", String::new(), py_float(fcen), py_float(fwidth))
                }
            };
            serde_json::json!({
                "type": src_type,
                "frequency": frequency,
                "fcen": fcen,
                "fwidth": fwidth,
                "component": s.component.to_meep_python(),
                "center": py_vec(&s.center),
                "size": py_vec(&s.size),
            })
        })
        .collect();

    let symmetries = sim
        .symmetries
        .iter()
        .map(|s| match s {
            Symmetry::Mirror(axis) => format!("mp.Mirror({})", axis.to_meep_python()),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let stack_summary = sim
        .geometry
        .iter()
        .map(|g| format!("{} {} um", g.name, g.size.y))
        .collect::<Vec<_>>()
        .join(" | ");

    // The baseline pass always runs on an empty cell
    let baseline_geometry = if sim.geometry_for(RunKind::Baseline).is_empty() {
        "[]"
    } else {
        "build_geometry()"
    };

    let (until, decay_dt, decay_by, decay_component) = match sim.run {
        RunCondition::Until(t) => (Some(py_float(t)), None, None, None),
        RunCondition::FieldsDecayed {
            dt,
            component,
            decay_by,
        } => (
            None,
            Some(py_float(dt)),
            Some(py_float(decay_by)),
            Some(component.to_meep_python()),
        ),
    };

    let (save_plots, plot_dir) = match &options.plot_output {
        PlotOutput::Interactive => (false, None),
        PlotOutput::SaveTo(dir) => (true, Some(py_str(&dir.to_string_lossy())?)),
    };

    let results_path = options
        .results_path
        .as_ref()
        .map(|p| py_str(&p.to_string_lossy()))
        .transpose()?;

    let field_component = sim
        .sources
        .first()
        .map(|s| s.component.to_meep_python())
        .unwrap_or("mp.Ez");

    let output = template.render(context! {
        header_comment => &options.header_comment,
        timestamp => chrono::Utc::now().to_rfc3339(),
        stack_summary => stack_summary,
        save_plots => save_plots,
        plot_dir => plot_dir,
        results_path => results_path,
        library_imports => sim.library_imports(),
        resolution => py_float(sim.resolution),
        cell_x => py_float(sim.cell_size.x),
        cell_y => py_float(sim.cell_size.y),
        pml_thickness => py_float(sim.pml_thickness),
        pml_axis => sim.pml_axis.to_meep_python(),
        fcen => py_float(sim.flux_monitor.fcen),
        df => py_float(sim.flux_monitor.df),
        nfreq => sim.flux_monitor.nfreq,
        until => until,
        decay_dt => decay_dt,
        decay_by => decay_by,
        decay_component => decay_component,
        k_point => py_vec(&sim.k_point),
        symmetries => symmetries,
        monitor_center => py_vec(&sim.flux_monitor.center),
        monitor_size => py_vec(&sim.flux_monitor.size),
        sources => sources,
        geometry => geometry,
        default_material => sim.default_material.as_ref().map(|m| m.to_meep_python()),
        baseline_geometry => baseline_geometry,
        layout_dpi => sim.plots.layout_dpi,
        device_dpi => sim.plots.device_dpi,
        field_dpi => sim.plots.field_dpi,
        field_component => field_component,
    })?;

    Ok(output)
}
