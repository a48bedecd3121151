//! Boolean operations with a mandatory validity pre-pass: before any
//! union/difference, if input is invalid, attempt repair by
//! buffer-by-zero; if still invalid, fail the operation.

use crate::error::GeometricFailure;
use crate::geometry::repair::ensure_valid_multi;
use geo::BooleanOps;
use geo_types::MultiPolygon;

fn prepare(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<(MultiPolygon<f64>, MultiPolygon<f64>), GeometricFailure> {
    Ok((ensure_valid_multi(a)?, ensure_valid_multi(b)?))
}

pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometricFailure> {
    let (a, b) = prepare(a, b)?;
    Ok(a.union(&b))
}

pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometricFailure> {
    let (a, b) = prepare(a, b)?;
    Ok(a.intersection(&b))
}

pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometricFailure> {
    let (a, b) = prepare(a, b)?;
    Ok(a.difference(&b))
}

pub fn xor(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometricFailure> {
    let (a, b) = prepare(a, b)?;
    Ok(a.xor(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use geo_types::{coord, LineString, Polygon};

    fn square(cx: f64, cy: f64, side: f64) -> MultiPolygon<f64> {
        let h = side / 2.0;
        MultiPolygon::new(vec![Polygon::new(
            LineString::new(vec![
                coord! {x: cx - h, y: cy - h},
                coord! {x: cx + h, y: cy - h},
                coord! {x: cx + h, y: cy + h},
                coord! {x: cx - h, y: cy + h},
                coord! {x: cx - h, y: cy - h},
            ]),
            vec![],
        )])
    }

    #[test]
    fn difference_removes_overlap() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        let d = difference(&a, &b).unwrap();
        assert!(d.unsigned_area() < a.unsigned_area());
    }

    #[test]
    fn union_of_disjoint_squares_sums_area() {
        let a = square(0.0, 0.0, 4.0);
        let b = square(100.0, 100.0, 4.0);
        let u = union(&a, &b).unwrap();
        assert!((u.unsigned_area() - 32.0).abs() < 1e-6);
    }
}
