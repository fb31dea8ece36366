use log::debug;

use crate::cutpath::{CutKind, CutPath, CutPoint, CutProcess};
use crate::entities::{PlacedPiece, SheetResult};
use crate::geometry::geo_traits::DistanceTo;
use crate::geometry::primitives::Point;

/// Torch entry inset from the piece corner for plasma cutting.
pub const PLASMA_ENTRY_INSET: f64 = 5.0;
/// Pieces with centroids closer than this form one heat region.
pub const THERMAL_RADIUS: f64 = 100.0;

fn entry_point(piece: &PlacedPiece, process: CutProcess) -> (f64, f64) {
    match process {
        CutProcess::Plasma => (piece.x + PLASMA_ENTRY_INSET, piece.y + PLASMA_ENTRY_INSET),
        CutProcess::OxyFuel => (piece.x, piece.y + piece.height / 2.0),
        CutProcess::Generic => (piece.x, piece.y),
    }
}

/// Entry, start and end stop of one placed piece.
fn piece_points(index: usize, piece: &PlacedPiece, process: CutProcess) -> [CutPoint; 3] {
    let (ex, ey) = entry_point(piece, process);
    [
        CutPoint {
            x: ex,
            y: ey,
            piece: index,
            kind: CutKind::Entry,
        },
        CutPoint {
            x: piece.x,
            y: piece.y,
            piece: index,
            kind: CutKind::Start,
        },
        CutPoint {
            x: piece.x + piece.width,
            y: piece.y + piece.height,
            piece: index,
            kind: CutKind::End,
        },
    ]
}

/// Nearest-neighbor tour over the pooled cut points of one sheet.
///
/// The tour begins at the point closest to the machine origin and repeatedly
/// hops to the closest unvisited point; ties go to the earlier point. The
/// approach from the origin does not count towards the tour length.
pub fn plan(sheet: &SheetResult, process: CutProcess) -> CutPath {
    let pooled: Vec<CutPoint> = sheet
        .placed
        .iter()
        .enumerate()
        .flat_map(|(i, p)| piece_points(i, p, process))
        .collect();
    let path = nearest_neighbor_tour(pooled);
    debug!(
        "[CUT] toured {} points over {:.1} mm with {} pierces",
        path.points.len(),
        path.total_distance,
        path.pierce_count
    );
    path
}

fn nearest_neighbor_tour(mut remaining: Vec<CutPoint>) -> CutPath {
    let pierce_count = remaining
        .iter()
        .filter(|p| p.kind == CutKind::Entry)
        .count();
    let mut points = Vec::with_capacity(remaining.len());
    let mut total_distance = 0.0;
    let mut cursor = Point(0.0, 0.0);

    while !remaining.is_empty() {
        let mut nearest = 0;
        let mut nearest_sq = f64::INFINITY;
        for (i, point) in remaining.iter().enumerate() {
            let sq = cursor.sq_distance_to(&point.position());
            if sq < nearest_sq {
                nearest_sq = sq;
                nearest = i;
            }
        }
        let point = remaining.remove(nearest);
        if !points.is_empty() {
            total_distance += cursor.distance_to(&point.position());
        }
        cursor = point.position();
        points.push(point);
    }

    CutPath {
        points,
        total_distance,
        pierce_count,
    }
}

/// Thermal-aware variant: pieces are grouped into heat regions by proximity
/// and the regions are interleaved round-robin, so consecutive cuts land far
/// apart and the plate cools between passes through the same region. Every
/// piece keeps its entry, start, end triple together.
pub fn plan_thermal(sheet: &SheetResult, process: CutProcess) -> CutPath {
    let clusters = proximity_clusters(&sheet.placed);
    debug!(
        "[CUT] {} heat regions over {} pieces",
        clusters.len(),
        sheet.placed.len()
    );

    let mut points = Vec::with_capacity(sheet.placed.len() * 3);
    let mut row = 0;
    loop {
        let mut any = false;
        for cluster in &clusters {
            if let Some(&piece_index) = cluster.get(row) {
                points.extend(piece_points(
                    piece_index,
                    &sheet.placed[piece_index],
                    process,
                ));
                any = true;
            }
        }
        if !any {
            break;
        }
        row += 1;
    }

    let pierce_count = points
        .iter()
        .filter(|p| p.kind == CutKind::Entry)
        .count();
    let total_distance = points
        .windows(2)
        .map(|w| w[0].position().distance_to(&w[1].position()))
        .sum();
    CutPath {
        points,
        total_distance,
        pierce_count,
    }
}

/// Greedy single-linkage clustering on piece centroids: an unassigned piece
/// seeds a region and absorbs every piece within the thermal radius,
/// transitively through already absorbed members.
fn proximity_clusters(placed: &[PlacedPiece]) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; placed.len()];
    let mut clusters = Vec::new();

    for seed in 0..placed.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut cluster = vec![seed];
        let mut frontier = 0;
        while frontier < cluster.len() {
            let anchor = placed[cluster[frontier]].centroid();
            for (i, piece) in placed.iter().enumerate() {
                if !assigned[i] && anchor.distance_to(&piece.centroid()) <= THERMAL_RADIUS {
                    assigned[i] = true;
                    cluster.push(i);
                }
            }
            frontier += 1;
        }
        clusters.push(cluster);
    }
    clusters
}
