//! MEEP simulation representation for the two-pass SPR run

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{Anchor, DeviceConfig, PlotConfig, RunCondition, SourceKind, SpectralBand};
use crate::error::SetupError;
use crate::material::{library_imports, Material, MaterialCatalog};
use crate::stack::LayerStack;

/// Cartesian direction as understood by MEEP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn to_meep_python(&self) -> &'static str {
        match self {
            Axis::X => "mp.X",
            Axis::Y => "mp.Y",
            Axis::Z => "mp.Z",
        }
    }
}

/// Field component used for sources, decay checks and field plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldComponent {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
}

impl FieldComponent {
    pub fn to_meep_python(&self) -> &'static str {
        match self {
            FieldComponent::Ex => "mp.Ex",
            FieldComponent::Ey => "mp.Ey",
            FieldComponent::Ez => "mp.Ez",
            FieldComponent::Hx => "mp.Hx",
            FieldComponent::Hy => "mp.Hy",
            FieldComponent::Hz => "mp.Hz",
        }
    }
}

/// Which of the two solver passes is being described
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Empty cell, records the incident flux
    Baseline,
    /// Full layer stack with the nanodisk
    Device,
}

/// Axis-aligned block (the only primitive this device needs)
#[derive(Debug, Clone, PartialEq)]
pub struct MeepBlock {
    pub name: String,
    pub center: Vector3<f64>,
    pub size: Vector3<f64>,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeepSourceType {
    ContinuousSource { frequency: f64 },
    GaussianSource { fcen: f64, fwidth: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeepSource {
    pub source_type: MeepSourceType,
    pub component: FieldComponent,
    pub center: Vector3<f64>,
    pub size: Vector3<f64>,
}

impl MeepSource {
    /// Vacuum wavelength (µm) of a continuous source
    pub fn wavelength(&self) -> Option<f64> {
        match self.source_type {
            MeepSourceType::ContinuousSource { frequency } => Some(1.0 / frequency),
            MeepSourceType::GaussianSource { .. } => None,
        }
    }
}

/// Flux region for the normalization spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct MeepFluxMonitor {
    pub center: Vector3<f64>,
    pub size: Vector3<f64>,
    pub fcen: f64,
    pub df: f64,
    pub nfreq: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Mirror(Axis),
}

/// A MEEP simulation setup shared by the baseline and device runs
#[derive(Debug, Clone)]
pub struct MeepSimulation {
    /// Cell size (z = 0 for the 2-D cell)
    pub cell_size: Vector3<f64>,
    /// Resolution (pixels per µm)
    pub resolution: f64,
    pub pml_thickness: f64,
    pub pml_axis: Axis,
    pub k_point: Vector3<f64>,
    pub symmetries: Vec<Symmetry>,
    pub default_material: Option<Material>,
    /// Device geometry, bottom layer first
    pub geometry: Vec<MeepBlock>,
    pub sources: Vec<MeepSource>,
    pub flux_monitor: MeepFluxMonitor,
    pub run: RunCondition,
    pub band: SpectralBand,
    pub plots: PlotConfig,
}

impl MeepSimulation {
    /// Build the simulation description from validated device parameters
    pub fn from_config(config: &DeviceConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let stack = LayerStack::from_config(config)?;
        let sx = config.cell_width();
        let sy = stack.cell_height(config.pml_thickness, config.padding);
        stack.check_contiguous(sy, config.pml_thickness, config.padding)?;

        for layer in stack.sub_pixel_layers(config.resolution) {
            tracing::warn!(
                "{} ({} µm) is thinner than one grid cell ({:.4} µm); relying on subpixel averaging",
                layer.name,
                layer.thickness,
                1.0 / config.resolution
            );
        }

        let geometry: Vec<MeepBlock> = stack
            .placements(sy)
            .iter()
            .map(|p| MeepBlock {
                name: p.layer.name.clone(),
                center: Vector3::new(0.0, p.center_y, 0.0),
                size: Vector3::new(p.layer.width, p.layer.thickness, p.layer.depth),
                material: p.layer.material.clone(),
            })
            .collect();

        let anchor_y = |anchor: Anchor| match anchor {
            Anchor::Top => 0.5 * sy - config.pml_thickness - 0.5 * config.padding,
            Anchor::Center => 0.0,
            Anchor::Bottom => -0.5 * sy + config.pml_thickness + 0.5 * config.layers.si_thickness,
        };

        let band = config.band;
        let source_type = match config.source.kind {
            SourceKind::Continuous { frequency } => MeepSourceType::ContinuousSource { frequency },
            SourceKind::Gaussian => MeepSourceType::GaussianSource {
                fcen: band.fcen(),
                fwidth: band.df(),
            },
        };

        // Line source spanning the periodic cell
        let sources = vec![MeepSource {
            source_type,
            component: config.source.component,
            center: Vector3::new(0.0, anchor_y(config.source.position), 0.0),
            size: Vector3::new(sx, 0.0, 0.0),
        }];

        let flux_monitor = MeepFluxMonitor {
            center: Vector3::new(0.0, anchor_y(config.monitor.position), 0.0),
            size: Vector3::new(sx, 0.0, 0.0),
            fcen: band.fcen(),
            df: band.df(),
            nfreq: config.monitor.nfreq,
        };

        let default_material = match &config.materials.background {
            Some(name) => Some(
                MaterialCatalog::with_mos2_epsilon(config.materials.mos2_epsilon).resolve(name)?,
            ),
            None => None,
        };

        let sim = Self {
            cell_size: Vector3::new(sx, sy, 0.0),
            resolution: config.resolution,
            pml_thickness: config.pml_thickness,
            pml_axis: Axis::Y,
            k_point: Vector3::zeros(),
            symmetries: vec![Symmetry::Mirror(Axis::X)],
            default_material,
            geometry,
            sources,
            flux_monitor,
            run: config.run,
            band,
            plots: config.plots.clone(),
        };

        for warning in sim.material_range_warnings() {
            tracing::warn!("{}", warning);
        }

        tracing::debug!(
            "cell {:.4} x {:.4} µm, {} blocks, flux band {:.4}..{:.4}",
            sx,
            sy,
            sim.geometry.len(),
            band.fmin(),
            band.fmax()
        );

        Ok(sim)
    }

    /// Geometry attached to the given pass
    pub fn geometry_for(&self, kind: RunKind) -> &[MeepBlock] {
        match kind {
            RunKind::Baseline => &[],
            RunKind::Device => &self.geometry,
        }
    }

    /// `meep.materials` names the script must import
    pub fn library_imports(&self) -> Vec<&'static str> {
        library_imports(
            self.geometry
                .iter()
                .map(|b| &b.material)
                .chain(self.default_material.iter()),
        )
    }

    /// Materials whose dispersion fit does not span the simulated wavelengths
    pub fn material_range_warnings(&self) -> Vec<String> {
        let mut wvl_min = self.band.wvl_min;
        let mut wvl_max = self.band.wvl_max;
        for wvl in self.sources.iter().filter_map(MeepSource::wavelength) {
            wvl_min = wvl_min.min(wvl);
            wvl_max = wvl_max.max(wvl);
        }

        let mut libs: Vec<_> = self
            .geometry
            .iter()
            .filter_map(|b| b.material.library())
            .collect();
        libs.sort();
        libs.dedup();

        libs.into_iter()
            .filter(|lib| !lib.covers(wvl_min, wvl_max))
            .map(|lib| {
                let (lo, hi) = lib.valid_wavelengths();
                format!(
                    "{} dispersion fit covers {}..{} µm but the run spans {:.4}..{:.4} µm",
                    lib, lo, hi, wvl_min, wvl_max
                )
            })
            .collect()
    }

    /// Point used by the field-decay stop condition
    pub fn monitor_point(&self) -> Vector3<f64> {
        self.flux_monitor.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::material::LibraryMaterial;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_simulation_layout() {
        let sim = MeepSimulation::from_config(&DeviceConfig::default()).unwrap();

        assert!((sim.cell_size.x - 0.26).abs() < 1e-12);
        assert!((sim.cell_size.y - 1.5407).abs() < 1e-12);
        assert_eq!(sim.cell_size.z, 0.0);
        assert_eq!(sim.pml_axis, Axis::Y);
        assert_eq!(sim.symmetries, vec![Symmetry::Mirror(Axis::X)]);
        assert_eq!(sim.k_point, Vector3::zeros());
        assert_eq!(sim.default_material, None);

        let names: Vec<&str> = sim.geometry.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Si substrate", "SiO2 layer", "MoS2 layer", "AgND"]);
        assert_eq!(sim.geometry[0].size, Vector3::new(1.0, 0.2 + 0.6, 1.0));
        assert_eq!(sim.geometry[3].size, Vector3::new(0.16, 0.04, 0.16));
        assert_eq!(
            sim.geometry[3].material,
            Material::Library(LibraryMaterial::Ag)
        );
    }

    #[test]
    fn test_source_in_top_padding() {
        let sim = MeepSimulation::from_config(&DeviceConfig::default()).unwrap();
        let src = &sim.sources[0];

        assert_eq!(
            src.source_type,
            MeepSourceType::ContinuousSource { frequency: 1.89 }
        );
        assert_eq!(src.component, FieldComponent::Ez);
        assert!((src.center.y - 0.47035).abs() < 1e-12);
        assert!((src.size.x - 0.26).abs() < 1e-12);

        // Between the nanodisk top and the PML
        let disk_top = sim.geometry[3].center.y + 0.5 * sim.geometry[3].size.y;
        let pml_edge = 0.5 * sim.cell_size.y - sim.pml_thickness;
        assert!(src.center.y > disk_top && src.center.y < pml_edge);
    }

    #[test]
    fn test_flux_monitor_band() {
        let sim = MeepSimulation::from_config(&DeviceConfig::default()).unwrap();
        let flux = &sim.flux_monitor;

        assert_eq!(flux.center, Vector3::zeros());
        assert_eq!(flux.nfreq, 21);
        assert!((flux.fcen - 2.0833333333).abs() < 1e-9);
        assert!((flux.df - 0.8333333333).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_has_no_geometry() {
        let sim = MeepSimulation::from_config(&DeviceConfig::default()).unwrap();
        assert!(sim.geometry_for(RunKind::Baseline).is_empty());
        assert_eq!(sim.geometry_for(RunKind::Device).len(), 4);
    }

    #[test]
    fn test_gaussian_source_spans_band() {
        let mut config = DeviceConfig::default();
        config.source.kind = SourceKind::Gaussian;
        config.monitor = MonitorConfig {
            nfreq: 50,
            position: Anchor::Top,
        };
        let sim = MeepSimulation::from_config(&config).unwrap();

        match sim.sources[0].source_type {
            MeepSourceType::GaussianSource { fcen, fwidth } => {
                assert_eq!(fcen, config.band.fcen());
                assert_eq!(fwidth, config.band.df());
            }
            _ => panic!("Expected GaussianSource"),
        }
        assert_eq!(sim.monitor_point(), sim.sources[0].center);
        assert_eq!(sim.sources[0].wavelength(), None);
    }

    #[test]
    fn test_bottom_anchor_inside_substrate() {
        let mut config = DeviceConfig::default();
        config.monitor.position = Anchor::Bottom;
        let sim = MeepSimulation::from_config(&config).unwrap();

        let y = sim.flux_monitor.center.y;
        let pml_edge = -0.5 * sim.cell_size.y + sim.pml_thickness;
        let si_top = sim.geometry[0].center.y + 0.5 * sim.geometry[0].size.y;
        assert!(y > pml_edge && y < si_top);
    }

    #[test]
    fn test_imports_and_range_warnings() {
        let sim = MeepSimulation::from_config(&DeviceConfig::default()).unwrap();
        assert_eq!(sim.library_imports(), vec!["Si", "Ag", "SiO2"]);
        assert!(sim.material_range_warnings().is_empty());

        let mut config = DeviceConfig::default();
        config.band.wvl_min = 0.3;
        let sim = MeepSimulation::from_config(&config).unwrap();
        let warnings = sim.material_range_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Si dispersion fit"));
    }

    #[test]
    fn test_background_material() {
        let mut config = DeviceConfig::default();
        config.materials.background = Some("glass".to_string());
        let sim = MeepSimulation::from_config(&config).unwrap();
        assert_eq!(sim.default_material, Some(Material::Index { index: 1.5 }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DeviceConfig::default();
        config.layers.ag_period = -1.0;
        assert!(MeepSimulation::from_config(&config).is_err());
    }
}
