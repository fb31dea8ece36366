//! Cut sequencing: turns a nested sheet into a torch tour and a machine
//! program.

use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Point;

mod planner;
mod program;

#[doc(inline)]
pub use planner::{PLASMA_ENTRY_INSET, THERMAL_RADIUS, plan, plan_thermal};
#[doc(inline)]
pub use program::{PIERCE_DWELL_S, emit_program};

/// Role of a point within a piece's cut sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    /// Pierce position, approached with a rapid move.
    Entry,
    /// First point of the contour cut.
    Start,
    /// Last point of the contour cut, torch off afterwards.
    End,
}

impl CutKind {
    pub fn label(&self) -> &'static str {
        match self {
            CutKind::Entry => "entry",
            CutKind::Start => "start",
            CutKind::End => "end",
        }
    }
}

/// One stop of the torch tour. `piece` indexes the sheet's placements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutPoint {
    pub x: f64,
    pub y: f64,
    pub piece: usize,
    pub kind: CutKind,
}

impl CutPoint {
    pub fn position(&self) -> Point {
        Point(self.x, self.y)
    }
}

/// Ordered torch tour over one sheet.
#[derive(Debug, Clone, Default)]
pub struct CutPath {
    pub points: Vec<CutPoint>,
    /// Tour length in mm, excluding the approach from the machine origin.
    pub total_distance: f64,
    /// One pierce per piece.
    pub pierce_count: usize,
}

/// Cutting process, decides where the torch enters each piece.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CutProcess {
    #[default]
    Plasma,
    OxyFuel,
    Generic,
}

/// Cut tour and machine program for one sheet of a layout.
#[derive(Debug, Clone)]
pub struct CutPlan {
    pub sheet_index: usize,
    pub path: CutPath,
    pub program: Vec<String>,
}
