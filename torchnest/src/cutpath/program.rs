use crate::cutpath::{CutKind, CutPath};

/// Dwell after each pierce, in seconds.
pub const PIERCE_DWELL_S: f64 = 0.5;

/// Renders a tour as a machine program: metric, absolute coordinates, one
/// pierce cycle per entry point, torch parked at the origin afterwards.
pub fn emit_program(path: &CutPath, sheet_index: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(path.points.len() * 2 + 8);
    lines.push(format!("; sheet {} cut program", sheet_index + 1));
    lines.push(format!(
        "; {} pierces, {:.1} mm travel",
        path.pierce_count, path.total_distance
    ));
    lines.push("G21 ; metric".into());
    lines.push("G90 ; absolute coordinates".into());
    lines.push("M03 ; torch on".into());

    for point in &path.points {
        match point.kind {
            CutKind::Entry => {
                lines.push(format!("G00 X{:.2} Y{:.2}", point.x, point.y));
                lines.push("M07 ; pierce".into());
                lines.push(format!("G04 P{PIERCE_DWELL_S}"));
            }
            CutKind::Start => lines.push(format!("G01 X{:.2} Y{:.2}", point.x, point.y)),
            CutKind::End => {
                lines.push(format!("G01 X{:.2} Y{:.2}", point.x, point.y));
                lines.push("M05 ; torch off".into());
            }
        }
    }

    lines.push("M08 ; gas off".into());
    lines.push("G00 X0.00 Y0.00".into());
    lines.push("M30 ; program end".into());
    lines
}
