use anyhow::{Result, ensure};

use crate::geometry::primitives::Rect;

/// Stock sheet description, shared by every sheet opened during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSpec {
    /// Usable width in mm.
    pub width: f64,
    /// Usable height in mm.
    pub height: f64,
    /// Cut width of the torch in mm; placements keep at least this much
    /// separation between pieces.
    pub kerf: f64,
    /// Plate thickness in mm, drives weight and cost.
    pub thickness: f64,
    pub material: String,
}

impl SheetSpec {
    pub fn try_new(
        width: f64,
        height: f64,
        kerf: f64,
        thickness: f64,
        material: impl Into<String>,
    ) -> Result<Self> {
        ensure!(
            width > 0.0 && height > 0.0,
            "invalid sheet dimensions: {width}x{height}"
        );
        ensure!(kerf >= 0.0, "negative kerf: {kerf}");
        ensure!(thickness > 0.0, "invalid sheet thickness: {thickness}");
        Ok(SheetSpec {
            width,
            height,
            kerf,
            thickness,
            material: material.into(),
        })
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::from_dims(0.0, 0.0, self.width, self.height)
    }

    /// Weight in kg of one full sheet of this stock.
    pub fn weight_kg(&self) -> f64 {
        self.area() * self.thickness * density_of(&self.material) / 1e7
    }
}

/// Density in kg/dm³ assumed when the material is not in the table.
pub const FALLBACK_DENSITY: f64 = 7.85;
/// Cost per kg assumed when the material is not in the table.
pub const FALLBACK_COST_PER_KG: f64 = 5.50;

const DENSITIES: &[(&str, f64)] = &[
    ("steel", 7.85),
    ("stainless", 7.90),
    ("aluminum", 2.70),
    ("copper", 8.96),
    ("brass", 8.47),
];

const COSTS_PER_KG: &[(&str, f64)] = &[
    ("steel", 1.20),
    ("stainless", 4.80),
    ("aluminum", 3.50),
    ("copper", 9.10),
    ("brass", 7.60),
];

/// Density in kg/dm³ for a material name, case-insensitive.
pub fn density_of(material: &str) -> f64 {
    lookup(DENSITIES, material).unwrap_or(FALLBACK_DENSITY)
}

/// Cost per kg for a material name, case-insensitive.
pub fn cost_per_kg_of(material: &str) -> f64 {
    lookup(COSTS_PER_KG, material).unwrap_or(FALLBACK_COST_PER_KG)
}

fn lookup(table: &[(&str, f64)], material: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(material.trim()))
        .map(|&(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonsensical_specs() {
        assert!(SheetSpec::try_new(0.0, 100.0, 1.0, 3.0, "steel").is_err());
        assert!(SheetSpec::try_new(100.0, 100.0, -1.0, 3.0, "steel").is_err());
        assert!(SheetSpec::try_new(100.0, 100.0, 1.0, 0.0, "steel").is_err());
        assert!(SheetSpec::try_new(100.0, 100.0, 0.0, 3.0, "steel").is_ok());
    }

    #[test]
    fn sheet_weight_follows_the_density_table() {
        // 1000x2000x5mm steel plate
        let sheet = SheetSpec::try_new(1000.0, 2000.0, 1.5, 5.0, "Steel").unwrap();
        assert!((sheet.weight_kg() - 7.85).abs() < 1e-9);

        let alu = SheetSpec::try_new(1000.0, 2000.0, 1.5, 5.0, "aluminum").unwrap();
        assert!((alu.weight_kg() - 2.70).abs() < 1e-9);
    }

    #[test]
    fn unknown_materials_use_fallbacks() {
        assert_eq!(density_of("unobtainium"), FALLBACK_DENSITY);
        assert_eq!(cost_per_kg_of("unobtainium"), FALLBACK_COST_PER_KG);
        assert_eq!(density_of(" Copper "), 8.96);
    }
}
