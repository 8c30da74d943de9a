//! Device and run parameters
//!
//! All lengths are in µm, which is also the MEEP length unit, so a frequency
//! in MEEP units is simply `1 / wavelength`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::material::MOS2_EPSILON;
use crate::meep::FieldComponent;

/// Full parameter set for the normalization and device runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Grid resolution in pixels per µm
    pub resolution: f64,
    pub layers: LayerDims,
    /// PML thickness on the y boundaries
    pub pml_thickness: f64,
    /// Free space between the nanodisk top and the upper PML
    pub padding: f64,
    pub band: SpectralBand,
    pub source: SourceConfig,
    pub monitor: MonitorConfig,
    pub run: RunCondition,
    pub plots: PlotConfig,
    pub materials: MaterialNames,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            resolution: 60.0,
            layers: LayerDims::default(),
            pml_thickness: 0.2,
            padding: 0.2,
            band: SpectralBand::default(),
            source: SourceConfig::default(),
            monitor: MonitorConfig::default(),
            run: RunCondition::default(),
            plots: PlotConfig::default(),
            materials: MaterialNames::default(),
        }
    }
}

/// Layer thicknesses and lateral sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerDims {
    /// Overall device width (extends past the periodic cell)
    pub device_width: f64,
    pub si_thickness: f64,
    pub sio2_thickness: f64,
    pub mos2_thickness: f64,
    pub ag_thickness: f64,
    pub ag_width: f64,
    /// Nanodisk period, which is also the cell width
    pub ag_period: f64,
}

impl Default for LayerDims {
    fn default() -> Self {
        Self {
            device_width: 1.0,
            si_thickness: 0.6,
            sio2_thickness: 0.3,
            mos2_thickness: 0.0007,
            ag_thickness: 0.04,
            ag_width: 0.160,
            ag_period: 0.260,
        }
    }
}

/// Wavelength window covered by the flux monitor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralBand {
    pub wvl_min: f64,
    pub wvl_max: f64,
}

impl Default for SpectralBand {
    fn default() -> Self {
        Self {
            wvl_min: 0.4,
            wvl_max: 0.6,
        }
    }
}

impl SpectralBand {
    pub fn fmin(&self) -> f64 {
        1.0 / self.wvl_max
    }

    pub fn fmax(&self) -> f64 {
        1.0 / self.wvl_min
    }

    /// Center frequency
    pub fn fcen(&self) -> f64 {
        0.5 * (self.fmin() + self.fmax())
    }

    /// Frequency width
    pub fn df(&self) -> f64 {
        self.fmax() - self.fmin()
    }
}

/// Vertical anchor for sources and monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Middle of the padding region under the upper PML
    Top,
    /// Cell origin
    Center,
    /// Middle of the substrate, above the lower PML
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SourceKind {
    /// Single-frequency excitation
    Continuous { frequency: f64 },
    /// Broadband pulse spanning the monitor band
    Gaussian,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub component: FieldComponent,
    pub position: Anchor,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            // 532 nm pump, rounded as in the lab notes
            kind: SourceKind::Continuous { frequency: 1.89 },
            component: FieldComponent::Ez,
            position: Anchor::Top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub nfreq: usize,
    pub position: Anchor,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            nfreq: 21,
            position: Anchor::Center,
        }
    }
}

/// When each time-stepping run stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCondition {
    /// Fixed simulation time in MEEP units
    Until(f64),
    /// Run until the field at the monitor has decayed by `decay_by`,
    /// checking every `dt` after the sources turn off
    FieldsDecayed {
        dt: f64,
        component: FieldComponent,
        decay_by: f64,
    },
}

impl Default for RunCondition {
    fn default() -> Self {
        RunCondition::Until(200.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub layout_dpi: u32,
    pub device_dpi: u32,
    pub field_dpi: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            layout_dpi: 120,
            device_dpi: 600,
            field_dpi: 600,
        }
    }
}

/// Catalog names of the material in each layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialNames {
    pub substrate: String,
    pub oxide: String,
    pub film: String,
    pub disk: String,
    pub mos2_epsilon: f64,
    /// Background medium; vacuum when absent
    pub background: Option<String>,
}

impl Default for MaterialNames {
    fn default() -> Self {
        Self {
            substrate: "si".to_string(),
            oxide: "sio2".to_string(),
            film: "mos2".to_string(),
            disk: "ag".to_string(),
            mos2_epsilon: MOS2_EPSILON,
            background: None,
        }
    }
}

impl DeviceConfig {
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let json = fs::read_to_string(path).map_err(|source| SetupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Cell width along x, one nanodisk period
    pub fn cell_width(&self) -> f64 {
        self.layers.ag_period
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        let dims = &self.layers;
        let positive = [
            ("resolution", self.resolution),
            ("pml_thickness", self.pml_thickness),
            ("padding", self.padding),
            ("device_width", dims.device_width),
            ("si_thickness", dims.si_thickness),
            ("sio2_thickness", dims.sio2_thickness),
            ("mos2_thickness", dims.mos2_thickness),
            ("ag_thickness", dims.ag_thickness),
            ("ag_width", dims.ag_width),
            ("ag_period", dims.ag_period),
            ("wvl_min", self.band.wvl_min),
            ("wvl_max", self.band.wvl_max),
            ("mos2_epsilon", self.materials.mos2_epsilon),
        ];
        for (name, value) in positive {
            check_positive(name, value)?;
        }

        if self.band.wvl_min >= self.band.wvl_max {
            return Err(SetupError::InvalidBand {
                wvl_min: self.band.wvl_min,
                wvl_max: self.band.wvl_max,
            });
        }

        if dims.ag_width > dims.ag_period {
            return Err(SetupError::DiskWiderThanPeriod {
                width: dims.ag_width,
                period: dims.ag_period,
            });
        }

        if self.monitor.nfreq == 0 {
            return Err(SetupError::NoFluxBins);
        }

        if let SourceKind::Continuous { frequency } = self.source.kind {
            check_positive("source frequency", frequency)?;
        }

        match self.run {
            RunCondition::Until(t) => check_positive("run time", t)?,
            RunCondition::FieldsDecayed { dt, decay_by, .. } => {
                check_positive("decay check interval", dt)?;
                check_positive("decay_by", decay_by)?;
            }
        }

        Ok(())
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), SetupError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SetupError::NonPositive { name, value })
    }
}
