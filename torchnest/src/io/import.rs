use anyhow::{Context, Result};
use log::warn;

use crate::entities::{Piece, PieceShape, SheetSpec};
use crate::geometry::primitives::{Point, Rect};
use crate::io::ext_repr::{ExtInstance, ExtPiece, ExtShape};

/// Converts an external job description into pieces and a sheet spec.
///
/// Only structural problems (an unusable sheet) fail the import; per-piece
/// problems are left for quantity expansion to report as warnings, so one
/// bad piece never sinks the whole job.
pub fn import_instance(ext: &ExtInstance) -> Result<(Vec<Piece>, SheetSpec)> {
    let sheet = SheetSpec::try_new(
        ext.sheet.width,
        ext.sheet.height,
        ext.sheet.kerf,
        ext.sheet.thickness,
        &ext.sheet.material,
    )
    .context("unusable sheet description")?;
    let pieces = ext.pieces.iter().map(import_piece).collect();
    Ok((pieces, sheet))
}

fn import_piece(ext: &ExtPiece) -> Piece {
    let (shape, width, height) = match &ext.shape {
        None | Some(ExtShape::Rectangle) => (PieceShape::Rect, ext.width, ext.height),
        Some(ExtShape::Circle { radius }) => {
            let diameter = 2.0 * radius;
            if ext.width != diameter || ext.height != diameter {
                warn!(
                    "[IO] piece '{}': declared {}x{} replaced by circle diameter {}",
                    ext.id, ext.width, ext.height, diameter
                );
            }
            (
                PieceShape::Circle { radius: *radius },
                diameter,
                diameter,
            )
        }
        Some(ExtShape::Polygon { points }) => {
            let (points, width, height) = anchor_outline(points, (ext.width, ext.height));
            (PieceShape::Polygon { points }, width, height)
        }
        Some(ExtShape::Complex { points, source_ref }) => {
            let (points, width, height) = anchor_outline(points, (ext.width, ext.height));
            (
                PieceShape::Complex {
                    points,
                    source_ref: source_ref.clone(),
                },
                width,
                height,
            )
        }
    };
    Piece {
        id: ext.id.clone(),
        width,
        height,
        quantity: ext.quantity,
        allow_rotation: ext.allow_rotation,
        tag: ext.tag.clone(),
        shape,
        material: ext.material.clone(),
        thickness: ext.thickness,
    }
}

/// Translates outline points so their bounding box sits at the origin and
/// derives the piece dims from that box. An empty outline keeps the declared
/// dims.
fn anchor_outline(raw: &[(f64, f64)], declared: (f64, f64)) -> (Vec<Point>, f64, f64) {
    let points: Vec<Point> = raw.iter().map(|&(x, y)| Point(x, y)).collect();
    match Rect::bounding(&points) {
        Some(bbox) => {
            let anchored = points
                .into_iter()
                .map(|Point(x, y)| Point(x - bbox.x_min, y - bbox.y_min))
                .collect();
            (anchored, bbox.width(), bbox.height())
        }
        None => (points, declared.0, declared.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ExtInstance {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn minimal_job_fills_in_the_defaults() {
        let ext = parse(
            r#"{
                "pieces": [{"id": "bracket", "width": 100, "height": 50, "quantity": 2}],
                "sheet": {"width": 1000, "height": 500}
            }"#,
        );
        let (pieces, sheet) = import_instance(&ext).unwrap();

        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].shape, PieceShape::Rect);
        assert!(pieces[0].allow_rotation);
        assert_eq!(sheet.kerf, 0.0);
        assert_eq!(sheet.thickness, 1.0);
        assert_eq!(sheet.material, "steel");
    }

    #[test]
    fn circle_diameter_overrides_the_declared_dims() {
        let ext = parse(
            r#"{
                "pieces": [{
                    "id": "disc", "width": 10, "height": 10, "quantity": 1,
                    "shape": {"type": "circle", "data": {"radius": 25}}
                }],
                "sheet": {"width": 1000, "height": 500, "kerf": 2}
            }"#,
        );
        let (pieces, _) = import_instance(&ext).unwrap();

        assert_eq!(pieces[0].width, 50.0);
        assert_eq!(pieces[0].height, 50.0);
        assert_eq!(pieces[0].shape, PieceShape::Circle { radius: 25.0 });
    }

    #[test]
    fn polygon_outlines_are_anchored_at_the_origin() {
        let ext = parse(
            r#"{
                "pieces": [{
                    "id": "gusset", "width": 1, "height": 1, "quantity": 1,
                    "shape": {"type": "polygon", "data": {"points": [[10, 10], [110, 10], [10, 110]]}}
                }],
                "sheet": {"width": 1000, "height": 500}
            }"#,
        );
        let (pieces, _) = import_instance(&ext).unwrap();

        // dims come from the outline, not the declaration
        assert_eq!(pieces[0].width, 100.0);
        assert_eq!(pieces[0].height, 100.0);
        assert_eq!(
            pieces[0].shape,
            PieceShape::Polygon {
                points: vec![Point(0.0, 0.0), Point(100.0, 0.0), Point(0.0, 100.0)]
            }
        );
    }

    #[test]
    fn unusable_sheet_fails_the_import() {
        let ext = parse(
            r#"{
                "pieces": [],
                "sheet": {"width": 0, "height": 500}
            }"#,
        );
        assert!(import_instance(&ext).is_err());
    }

    #[test]
    fn complex_outline_keeps_its_source_reference() {
        let ext = parse(
            r#"{
                "pieces": [{
                    "id": "flange", "width": 1, "height": 1, "quantity": 1,
                    "shape": {"type": "complex", "data": {
                        "points": [[0, 0], [60, 0], [60, 40], [30, 55], [0, 40]],
                        "source_ref": "flange_rev2.dxf"
                    }}
                }],
                "sheet": {"width": 1000, "height": 500}
            }"#,
        );
        let (pieces, _) = import_instance(&ext).unwrap();

        assert_eq!(pieces[0].width, 60.0);
        assert_eq!(pieces[0].height, 55.0);
        match &pieces[0].shape {
            PieceShape::Complex { points, source_ref } => {
                assert_eq!(points.len(), 5);
                assert_eq!(source_ref.as_deref(), Some("flange_rev2.dxf"));
            }
            other => panic!("expected a complex shape, got {other:?}"),
        }
    }
}
