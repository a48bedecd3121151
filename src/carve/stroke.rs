//! Stroke and closed-polygon carve intents.

use crate::error::InvalidInput;
use crate::geometry::buffer::round_export_buffer;
use crate::geometry::repair::ensure_valid;
use geo::Area;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

/// Build the eraser polygon for a stroke: a round-capped buffer of the
/// polyline by half its width.
pub fn stroke_eraser(points: &[Coord<f64>], width: f64) -> Result<MultiPolygon<f64>, InvalidInput> {
    if points.len() < 2 {
        return Err(InvalidInput::DegenerateStroke);
    }
    if width <= 0.0 {
        return Err(InvalidInput::NonPositiveWidth(width));
    }
    let line = LineString::new(points.to_vec());
    Ok(round_export_buffer(&line, width / 2.0))
}

/// Build the eraser polygon for a closed-polygon carve intent: the ring
/// itself, after validity repair, rejected if its area is too small to be
/// a meaningful cut (area must exceed 0.1 m²).
pub fn closed_polygon_eraser(ring: &[Coord<f64>]) -> Result<MultiPolygon<f64>, InvalidInput> {
    if ring.len() < 3 {
        return Err(InvalidInput::DegenerateRing);
    }
    let mut closed = ring.to_vec();
    if closed.first() != closed.last() {
        closed.push(closed[0]);
    }
    let polygon = Polygon::new(LineString::new(closed), vec![]);
    let repaired = ensure_valid(&polygon).map_err(|_| InvalidInput::UnrepairableGeometry)?;
    if repaired.unsigned_area() <= 0.1 {
        return Err(InvalidInput::DegenerateRing);
    }
    Ok(MultiPolygon::new(vec![repaired]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn stroke_needs_two_points() {
        let err = stroke_eraser(&[coord! {x: 0.0, y: 0.0}], 1.0).unwrap_err();
        assert_eq!(err, InvalidInput::DegenerateStroke);
    }

    #[test]
    fn stroke_needs_positive_width() {
        let pts = [coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 0.0}];
        let err = stroke_eraser(&pts, 0.0).unwrap_err();
        assert_eq!(err, InvalidInput::NonPositiveWidth(0.0));
    }

    #[test]
    fn closed_polygon_rejects_tiny_area() {
        let tiny = [
            coord! {x: 0.0, y: 0.0},
            coord! {x: 0.1, y: 0.0},
            coord! {x: 0.1, y: 0.1},
            coord! {x: 0.0, y: 0.1},
        ];
        let err = closed_polygon_eraser(&tiny).unwrap_err();
        assert_eq!(err, InvalidInput::DegenerateRing);
    }
}
