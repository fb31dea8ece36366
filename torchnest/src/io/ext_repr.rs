use serde::{Deserialize, Serialize};

/// External representation of a whole nesting job: the pieces to cut and the
/// stock sheet to cut them from.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtInstance {
    pub pieces: Vec<ExtPiece>,
    pub sheet: ExtSheet,
}

/// External representation of a [`Piece`](crate::entities::Piece).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtPiece {
    /// Identifier of the piece, echoed back in placements and warnings
    pub id: String,
    /// Bounding box width in mm
    pub width: f64,
    /// Bounding box height in mm
    pub height: f64,
    pub quantity: usize,
    /// Whether the piece may be turned in 90° steps
    #[serde(default = "default_allow_rotation")]
    pub allow_rotation: bool,
    /// Free-form grouping label, carried through to the layout
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
    /// Outline refinement; a full rectangle if not specified
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shape: Option<ExtShape>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thickness: Option<f64>,
}

fn default_allow_rotation() -> bool {
    true
}

/// Various ways to refine a piece outline
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum ExtShape {
    /// Full axis-aligned rectangle, the default
    Rectangle,
    /// Circle of the given radius
    Circle { radius: f64 },
    /// Polygon with a single outer boundary
    Polygon { points: Vec<(f64, f64)> },
    /// Imported outline kept with a reference to its source file
    Complex {
        points: Vec<(f64, f64)>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        source_ref: Option<String>,
    },
}

/// External representation of a [`SheetSpec`](crate::entities::SheetSpec).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSheet {
    pub width: f64,
    pub height: f64,
    /// Cut width of the torch in mm
    #[serde(default)]
    pub kerf: f64,
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default = "default_material")]
    pub material: String,
}

fn default_thickness() -> f64 {
    1.0
}

fn default_material() -> String {
    "steel".into()
}

/// External representation of a [`NestSolution`](crate::entities::NestSolution)
/// together with the cut plans the solver attached to it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSolution {
    pub sheets: Vec<ExtSheetResult>,
    pub total_sheets: usize,
    pub total_waste_area: f64,
    pub average_efficiency: f64,
    pub total_weight_kg: f64,
    pub material_cost: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<ExtWarning>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cut_plans: Vec<ExtCutPlan>,
}

/// One nested sheet of the solution.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtSheetResult {
    pub index: usize,
    /// Utilized percentage of the sheet area
    pub efficiency: f64,
    pub utilized_area: f64,
    pub waste_area: f64,
    pub weight_kg: f64,
    pub placements: Vec<ExtPlacement>,
}

/// External representation of a [`PlacedPiece`](crate::entities::PlacedPiece).
/// Coordinates anchor the lower-left corner of the oriented bounding box.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtPlacement {
    pub piece_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Orientation in degrees
    pub rotation: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
}

/// A piece the solver had to drop, and why.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtWarning {
    pub piece: String,
    pub kind: String,
    pub quantity: usize,
    pub detail: String,
}

/// Torch tour and machine program for one sheet.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtCutPlan {
    pub sheet_index: usize,
    /// Tour length in mm
    pub total_distance: f64,
    pub pierce_count: usize,
    pub points: Vec<ExtCutPoint>,
    pub program: Vec<String>,
}

/// One stop of the torch tour.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExtCutPoint {
    pub x: f64,
    pub y: f64,
    /// Index of the piece in the sheet's placements
    pub piece: usize,
    pub kind: String,
}
