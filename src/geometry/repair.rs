//! Validity repair via the buffer-by-zero idiom.

use crate::error::{GeometricFailure, InvalidInput};
use geo::algorithm::buffer::Buffer;
use geo::algorithm::validation::Validation;
use geo::Area;
use geo_types::{MultiPolygon, Polygon};

/// If `polygon` is invalid, attempt to repair it by buffering at distance
/// zero and keeping the largest ring by area if the repair splits the
/// shape. Returns the (possibly unchanged) polygon, or an error if it is
/// still invalid after one repair attempt.
pub fn ensure_valid(polygon: &Polygon<f64>) -> Result<Polygon<f64>, GeometricFailure> {
    if polygon.is_valid() {
        return Ok(polygon.clone());
    }
    let repaired: MultiPolygon<f64> = polygon.buffer(0.0);
    let largest = keep_largest(&repaired).ok_or(GeometricFailure::StillInvalidAfterRepair)?;
    if !largest.is_valid() {
        return Err(GeometricFailure::StillInvalidAfterRepair);
    }
    Ok(largest)
}

/// Same repair, but for input that is already a `MultiPolygon`.
pub fn ensure_valid_multi(multi: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometricFailure> {
    let all_valid = multi.0.iter().all(|p| p.is_valid());
    if all_valid {
        return Ok(multi.clone());
    }
    let mut repaired_polys = Vec::with_capacity(multi.0.len());
    for poly in &multi.0 {
        repaired_polys.push(ensure_valid(poly)?);
    }
    Ok(MultiPolygon::new(repaired_polys))
}

/// Keep the largest-by-area polygon of a `MultiPolygon`, discarding the
/// rest. Returns `None` if the input is empty.
pub fn keep_largest(multi: &MultiPolygon<f64>) -> Option<Polygon<f64>> {
    multi
        .0
        .iter()
        .max_by(|a, b| a.unsigned_area().partial_cmp(&b.unsigned_area()).unwrap())
        .cloned()
}

/// Validate an imported field polygon, repairing once if invalid and
/// enforcing the area bounds. Returns the
/// validated polygon plus any warnings collected along the way.
pub fn validate_field_polygon(
    polygon: &Polygon<f64>,
    min_area_m2: f64,
    max_area_m2: f64,
) -> Result<(Polygon<f64>, Vec<crate::error::Warning>), InvalidInput> {
    use crate::error::Warning;
    let mut warnings = Vec::new();

    let candidate = if polygon.is_valid() {
        polygon.clone()
    } else {
        ensure_valid(polygon).map_err(|_| InvalidInput::UnrepairableGeometry)?
    };

    let area = candidate.unsigned_area();
    if area < min_area_m2 {
        return Err(InvalidInput::AreaTooSmall { area_m2: area, min_m2: min_area_m2 });
    }
    if area > max_area_m2 {
        return Err(InvalidInput::AreaTooLarge { area_m2: area, max_m2: max_area_m2 });
    }

    if geo::Area::signed_area(&candidate) < 0.0 {
        warnings.push(Warning::ClockwiseExteriorRing);
    }

    Ok((candidate, warnings))
}
