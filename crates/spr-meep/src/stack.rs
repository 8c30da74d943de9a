//! Vertical layer stack of the device
//!
//! Layers are listed bottom to top. Each layer's center is found from the
//! cumulative thickness of everything below it, measured from the bottom edge
//! of the cell at `-sy/2`:
//!
//! ```text
//! center_k = -sy/2 + (t_0 + ... + t_{k-1}) + t_k/2
//! ```
//!
//! The substrate layer includes the lower PML, so the cell height is the
//! stack total plus the top padding and the upper PML.

use crate::config::DeviceConfig;
use crate::error::SetupError;
use crate::material::{Material, MaterialCatalog};

/// Tolerance for contiguity and cell-height checks (µm)
pub const STACK_TOLERANCE: f64 = 1e-12;

/// A single slab of the device
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub material: Material,
    /// Extent along y
    pub thickness: f64,
    /// Extent along x
    pub width: f64,
    /// Extent along z (unused by the 2-D cell but kept for the block size)
    pub depth: f64,
}

/// A layer positioned inside the cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<'a> {
    pub layer: &'a Layer,
    pub bottom: f64,
    pub top: f64,
    pub center_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Si substrate (with lower PML), SiO2, MoS2 film, Ag nanodisk
    pub fn from_config(config: &DeviceConfig) -> Result<Self, SetupError> {
        let catalog = MaterialCatalog::with_mos2_epsilon(config.materials.mos2_epsilon);
        let names = &config.materials;
        let dims = &config.layers;

        let layers = vec![
            Layer {
                name: "Si substrate".to_string(),
                material: catalog.resolve(&names.substrate)?,
                thickness: config.pml_thickness + dims.si_thickness,
                width: dims.device_width,
                depth: dims.device_width,
            },
            Layer {
                name: "SiO2 layer".to_string(),
                material: catalog.resolve(&names.oxide)?,
                thickness: dims.sio2_thickness,
                width: dims.device_width,
                depth: dims.device_width,
            },
            Layer {
                name: "MoS2 layer".to_string(),
                material: catalog.resolve(&names.film)?,
                thickness: dims.mos2_thickness,
                width: dims.device_width,
                depth: dims.device_width,
            },
            Layer {
                name: "AgND".to_string(),
                material: catalog.resolve(&names.disk)?,
                thickness: dims.ag_thickness,
                width: dims.ag_width,
                depth: dims.ag_width,
            },
        ];

        Ok(Self::new(layers))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().fold(0.0, |acc, layer| acc + layer.thickness)
    }

    /// Cell size along y: stack, then padding, then the upper PML
    pub fn cell_height(&self, pml_thickness: f64, padding: f64) -> f64 {
        self.total_thickness() + padding + pml_thickness
    }

    /// Place every layer in a cell of height `sy` centered on the origin
    pub fn placements(&self, sy: f64) -> Vec<Placement<'_>> {
        let base = -0.5 * sy;
        let mut offset = 0.0;
        let mut out = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let center_y = base + offset + 0.5 * layer.thickness;
            out.push(Placement {
                layer,
                bottom: base + offset,
                top: base + offset + layer.thickness,
                center_y,
            });
            offset += layer.thickness;
        }

        out
    }

    /// Verify that `sy` fits the stack and that adjacent layers share an edge
    pub fn check_contiguous(
        &self,
        sy: f64,
        pml_thickness: f64,
        padding: f64,
    ) -> Result<(), SetupError> {
        let expected = self.cell_height(pml_thickness, padding);
        if (expected - sy).abs() > STACK_TOLERANCE {
            return Err(SetupError::CellHeightMismatch {
                expected,
                actual: sy,
            });
        }

        let placements = self.placements(sy);
        for pair in placements.windows(2) {
            let offset = pair[1].bottom - pair[0].top;
            if offset.abs() > STACK_TOLERANCE {
                return Err(SetupError::LayerGap {
                    below: pair[0].layer.name.clone(),
                    above: pair[1].layer.name.clone(),
                    offset,
                });
            }
        }

        Ok(())
    }

    /// Layers thinner than one grid cell; MEEP only sees them through
    /// subpixel averaging
    pub fn sub_pixel_layers(&self, resolution: f64) -> Vec<&Layer> {
        let pixel = 1.0 / resolution;
        self.layers.iter().filter(|l| l.thickness < pixel).collect()
    }
}
