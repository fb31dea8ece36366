//! Nesting and cut sequencing for plasma and oxy-fuel sheet cutting.
//!
//! Piece requests go in, a sheet layout comes out together with a torch tour
//! and a machine program per sheet. Layouts come from a greedy bottom-left
//! engine, a polygon-aware variant of it, or a genetic search over placement
//! orderings; [solver] arbitrates between them.

/// Cut sequencing and machine program emission
pub mod cutpath;

/// Entities to model nesting problems and their solutions
pub mod entities;

/// Geometric primitives and base algorithms
pub mod geometry;

/// Importing piece requests into and exporting solutions out of this library
pub mod io;

/// Placement engines and the ordering search
pub mod nesting;

/// Strategy selection, scoring and sensitivity analysis
pub mod solver;

/// Helper functions which do not belong to any specific module
pub mod util;
