mod layout;
mod piece;
mod placed_piece;
mod sheet;
mod solution;

#[doc(inline)]
pub use layout::{NestProblem, SheetKey, SheetLayout};
#[doc(inline)]
pub use piece::{CIRCLE_SEGMENTS, Piece, PieceInstance, PieceShape, expand_pieces};
#[doc(inline)]
pub use placed_piece::{PlacedPiece, Rotation};
#[doc(inline)]
pub use sheet::{
    FALLBACK_COST_PER_KG, FALLBACK_DENSITY, SheetSpec, cost_per_kg_of, density_of,
};
#[doc(inline)]
pub use solution::{NestSolution, PieceWarning, SheetResult, WarningKind};
