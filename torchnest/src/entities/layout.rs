use ordered_float::OrderedFloat;
use slotmap::{SlotMap, new_key_type};

use crate::entities::placed_piece::PlacedPiece;
use crate::entities::sheet::SheetSpec;
use crate::geometry::primitives::{Polygon, Rect};

new_key_type! {
    /// Key of an open sheet in a [NestProblem].
    pub struct SheetKey;
}

/// Placement state of a single open sheet.
///
/// The kerf/2-inflated boxes of every placement are kept alongside the
/// placements themselves so candidate tests run against precomputed rects.
/// Outlines are only stored for non-rectangular pieces placed by the polygon
/// engine.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    spec: SheetSpec,
    placed: Vec<PlacedPiece>,
    inflated: Vec<Rect>,
    outlines: Vec<Option<Polygon>>,
}

impl SheetLayout {
    pub fn new(spec: SheetSpec) -> Self {
        SheetLayout {
            spec,
            placed: vec![],
            inflated: vec![],
            outlines: vec![],
        }
    }

    pub fn spec(&self) -> &SheetSpec {
        &self.spec
    }

    pub fn placed(&self) -> &[PlacedPiece] {
        &self.placed
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Placed pieces paired with their sheet-coordinate outlines, where one
    /// was recorded.
    pub fn placed_with_outlines(&self) -> impl Iterator<Item = (&PlacedPiece, Option<&Polygon>)> {
        self.placed
            .iter()
            .zip(self.outlines.iter().map(Option::as_ref))
    }

    /// True iff `rect` lies within the sheet and its kerf/2-inflated box
    /// does not cut into any placed piece's inflated box.
    pub fn admits(&self, rect: &Rect) -> bool {
        if !self.spec.rect().contains(rect) {
            return false;
        }
        let inflated = rect.inflate(self.spec.kerf / 2.0);
        !self.inflated.iter().any(|r| r.overlaps_interior(&inflated))
    }

    /// Rightmost edge among occupied boxes overlapping the candidate box.
    /// `None` means the candidate is unobstructed.
    pub fn blocking_edge(&self, inflated: &Rect) -> Option<f64> {
        self.inflated
            .iter()
            .filter(|r| r.overlaps_interior(inflated))
            .map(|r| r.x_max)
            .max_by_key(|&x| OrderedFloat(x))
    }

    pub fn place(&mut self, piece: PlacedPiece, outline: Option<Polygon>) {
        self.inflated.push(piece.rect().inflate(self.spec.kerf / 2.0));
        self.outlines.push(outline);
        self.placed.push(piece);
    }

    /// Sum of placed bounding box areas.
    pub fn utilized_area(&self) -> f64 {
        self.placed.iter().map(|p| p.width * p.height).sum()
    }
}

/// Dynamic state of a nesting run: the set of open sheets, in opening order.
///
/// Grounded on a bin-packing problem layout map; sheets opened for a piece
/// that then fails to place are closed again and leave no trace in the
/// result.
#[derive(Debug, Clone)]
pub struct NestProblem {
    pub spec: SheetSpec,
    layouts: SlotMap<SheetKey, SheetLayout>,
    order: Vec<SheetKey>,
}

impl NestProblem {
    pub fn new(spec: SheetSpec) -> Self {
        NestProblem {
            spec,
            layouts: SlotMap::with_key(),
            order: vec![],
        }
    }

    pub fn open_sheet(&mut self) -> SheetKey {
        let key = self.layouts.insert(SheetLayout::new(self.spec.clone()));
        self.order.push(key);
        key
    }

    /// Removes a sheet again; only valid while it is still empty.
    pub fn close_sheet(&mut self, key: SheetKey) {
        debug_assert!(self.layouts[key].is_empty());
        self.layouts.remove(key);
        self.order.retain(|&k| k != key);
    }

    pub fn keys(&self) -> Vec<SheetKey> {
        self.order.clone()
    }

    pub fn layout(&self, key: SheetKey) -> &SheetLayout {
        &self.layouts[key]
    }

    pub fn layout_mut(&mut self, key: SheetKey) -> &mut SheetLayout {
        &mut self.layouts[key]
    }

    /// Open sheets in opening order.
    pub fn sheets(&self) -> impl Iterator<Item = &SheetLayout> {
        self.order.iter().map(|&k| &self.layouts[k])
    }

    pub fn sheet_count(&self) -> usize {
        self.order.len()
    }
}
