//! Optical materials and their MEEP representation
//!
//! Dispersive metals and semiconductors come from `meep.materials`; this module
//! only names them. Thin films without a library entry are given a constant
//! permittivity.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Relative permittivity of monolayer MoS2 near 530 nm (n = 3.53)
pub const MOS2_EPSILON: f64 = 12.46;

/// Entries of the MEEP material database used by this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LibraryMaterial {
    Si,
    Ag,
    SiO2,
}

impl LibraryMaterial {
    /// Name exported by `meep.materials`
    pub fn python_name(&self) -> &'static str {
        match self {
            LibraryMaterial::Si => "Si",
            LibraryMaterial::Ag => "Ag",
            LibraryMaterial::SiO2 => "SiO2",
        }
    }

    /// Wavelength range (µm) over which the library's dispersion fit is valid
    pub fn valid_wavelengths(&self) -> (f64, f64) {
        match self {
            LibraryMaterial::Si => (0.4, 1.0),
            LibraryMaterial::Ag => (0.2, 12.4),
            LibraryMaterial::SiO2 => (0.25, 1.77),
        }
    }

    /// Whether the whole interval `[wvl_min, wvl_max]` lies inside the fit range
    pub fn covers(&self, wvl_min: f64, wvl_max: f64) -> bool {
        let (lo, hi) = self.valid_wavelengths();
        wvl_min >= lo && wvl_max <= hi
    }
}

impl fmt::Display for LibraryMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.python_name())
    }
}

/// A material assignable to a geometry block
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Air,
    Library(LibraryMaterial),
    Dielectric { epsilon: f64 },
    Index { index: f64 },
}

impl Material {
    /// Generate MEEP Python code for this material
    pub fn to_meep_python(&self) -> String {
        match self {
            Material::Air => "mp.air".to_string(),
            Material::Library(lib) => lib.python_name().to_string(),
            Material::Dielectric { epsilon } => format!("mp.Medium(epsilon={:?})", epsilon),
            Material::Index { index } => format!("mp.Medium(index={:?})", index),
        }
    }

    pub fn library(&self) -> Option<LibraryMaterial> {
        match self {
            Material::Library(lib) => Some(*lib),
            _ => None,
        }
    }
}

/// Name -> material lookup used when a config overrides layer materials
pub struct MaterialCatalog {
    materials: HashMap<String, Material>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            materials: HashMap::new(),
        };

        catalog.add("air", Material::Air);
        catalog.add("si", Material::Library(LibraryMaterial::Si));
        catalog.add("ag", Material::Library(LibraryMaterial::Ag));
        catalog.add("sio2", Material::Library(LibraryMaterial::SiO2));
        catalog.add("mos2", Material::Dielectric { epsilon: MOS2_EPSILON });
        catalog.add("glass", Material::Index { index: 1.5 });

        catalog
    }

    /// Catalog with a custom MoS2 permittivity
    pub fn with_mos2_epsilon(epsilon: f64) -> Self {
        let mut catalog = Self::new();
        catalog.add("mos2", Material::Dielectric { epsilon });
        catalog
    }

    pub fn add(&mut self, name: &str, material: Material) {
        self.materials.insert(name.to_lowercase(), material);
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(&name.to_lowercase())
    }

    /// Look up a material, accepting a few common spellings
    pub fn resolve(&self, name: &str) -> Result<Material, SetupError> {
        let key = match name.trim().to_lowercase().as_str() {
            "silicon" => "si".to_string(),
            "silver" => "ag".to_string(),
            "oxide" | "silica" => "sio2".to_string(),
            "vacuum" => "air".to_string(),
            other => other.to_string(),
        };

        self.get(&key)
            .cloned()
            .ok_or_else(|| SetupError::UnknownMaterial(name.to_string()))
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted, de-duplicated `meep.materials` imports needed by `materials`
pub fn library_imports<'a>(materials: impl IntoIterator<Item = &'a Material>) -> Vec<&'static str> {
    let mut libs: Vec<LibraryMaterial> = materials.into_iter().filter_map(Material::library).collect();
    libs.sort();
    libs.dedup();
    libs.into_iter().map(|lib| lib.python_name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_to_meep() {
        assert_eq!(Material::Air.to_meep_python(), "mp.air");
        assert_eq!(Material::Library(LibraryMaterial::SiO2).to_meep_python(), "SiO2");
        assert_eq!(
            Material::Dielectric { epsilon: MOS2_EPSILON }.to_meep_python(),
            "mp.Medium(epsilon=12.46)"
        );
        assert_eq!(Material::Index { index: 1.5 }.to_meep_python(), "mp.Medium(index=1.5)");
    }

    #[test]
    fn test_catalog_aliases() {
        let catalog = MaterialCatalog::new();
        assert_eq!(catalog.resolve("Silver").unwrap(), Material::Library(LibraryMaterial::Ag));
        assert_eq!(catalog.resolve(" SiO2 ").unwrap(), Material::Library(LibraryMaterial::SiO2));
        assert!(matches!(
            catalog.resolve("unobtainium"),
            Err(SetupError::UnknownMaterial(name)) if name == "unobtainium"
        ));
    }

    #[test]
    fn test_custom_mos2_epsilon() {
        let catalog = MaterialCatalog::with_mos2_epsilon(15.0);
        assert_eq!(catalog.resolve("mos2").unwrap(), Material::Dielectric { epsilon: 15.0 });
    }

    #[test]
    fn test_library_imports_dedup() {
        let mats = [
            Material::Library(LibraryMaterial::Ag),
            Material::Dielectric { epsilon: 2.0 },
            Material::Library(LibraryMaterial::Si),
            Material::Library(LibraryMaterial::Ag),
        ];
        assert_eq!(library_imports(&mats), vec!["Si", "Ag"]);
    }

    #[test]
    fn test_visible_band_coverage() {
        assert!(LibraryMaterial::Si.covers(0.4, 0.6));
        assert!(LibraryMaterial::Ag.covers(0.4, 0.6));
        assert!(!LibraryMaterial::Si.covers(0.35, 0.6));
    }
}
