//! The authoritative field polygon.

use crate::error::{InvalidInput, Warning};
use crate::geometry::repair::validate_field_polygon;
use geo::Area;
use geo_types::{LineString, MultiPolygon, Polygon};

/// Minimum field area, in m².
pub const MIN_FIELD_AREA_M2: f64 = 1000.0;
/// Maximum field area, in m².
pub const MAX_FIELD_AREA_M2: f64 = 1.0e7;

/// The real-world crop area, centered and validated, with its CRS and
/// the offset needed to un-center it for geographic export.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    exterior: LineString<f64>,
    interiors: Vec<LineString<f64>>,
    crs: String,
    centroid_offset: (f64, f64),
}

impl Field {
    /// View the field as a `geo_types::Polygon`, interiors as holes.
    pub fn polygon(&self) -> Polygon<f64> {
        Polygon::new(self.exterior.clone(), self.interiors.clone())
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn centroid_offset(&self) -> (f64, f64) {
        self.centroid_offset
    }

    pub fn area_m2(&self) -> f64 {
        self.polygon().unsigned_area()
    }

    /// Rebuild a `Field` from its already-centered, already-validated
    /// parts. Used only by the project store when loading a saved
    /// project: the polygon was centered and checked once at import
    /// time, and re-running that pipeline on load would both waste work
    /// and recompute a centroid offset of `(0.0, 0.0)` for data that is
    /// already centered, discarding the real offset needed for
    /// geographic export.
    pub(crate) fn reconstruct(
        exterior: LineString<f64>,
        interiors: Vec<LineString<f64>>,
        crs: String,
        centroid_offset: (f64, f64),
    ) -> Field {
        Field { exterior, interiors, crs, centroid_offset }
    }

    /// Import a single polygon as the field, centering it about the
    /// centroid of its bounds and recording the offset for later
    /// geographic export.
    pub fn import_polygon(
        polygon: &Polygon<f64>,
        crs: impl Into<String>,
    ) -> Result<(Field, Vec<Warning>), InvalidInput> {
        let (validated, mut warnings) =
            validate_field_polygon(polygon, MIN_FIELD_AREA_M2, MAX_FIELD_AREA_M2)?;

        let (centered, offset) = center_polygon(&validated);
        warnings.sort();
        warnings.dedup();
        Ok((
            Field {
                exterior: centered.exterior().clone(),
                interiors: centered.interiors().to_vec(),
                crs: crs.into(),
                centroid_offset: offset,
            },
            warnings,
        ))
    }

    /// Import a `MultiPolygon`, keeping the largest ring by area and
    /// warning about the rest.
    pub fn import_multi_polygon(
        multi: &MultiPolygon<f64>,
        crs: impl Into<String>,
    ) -> Result<(Field, Vec<Warning>), InvalidInput> {
        let largest = crate::geometry::repair::keep_largest(multi)
            .ok_or(InvalidInput::UnrepairableGeometry)?;
        let (field, mut warnings) = Self::import_polygon(&largest, crs)?;
        if multi.0.len() > 1 {
            warnings.push(Warning::MultiPolygonKeptLargest);
        }
        warnings.sort();
        warnings.dedup();
        Ok((field, warnings))
    }

    /// A closed linestring is rejected as a field boundary: bare
    /// linestrings, even closed ones, are not accepted implicitly. This
    /// constructor exists so a caller can explicitly opt in after seeing
    /// the `BareLineString` warning/error from an importer.
    pub fn from_closed_linestring(
        ring: LineString<f64>,
        crs: impl Into<String>,
    ) -> Result<(Field, Vec<Warning>), InvalidInput> {
        if ring.0.first() != ring.0.last() || ring.0.len() < 4 {
            return Err(InvalidInput::BareLineString);
        }
        let polygon = Polygon::new(ring, vec![]);
        Self::import_polygon(&polygon, crs)
    }
}

fn center_polygon(polygon: &Polygon<f64>) -> (Polygon<f64>, (f64, f64)) {
    use crate::projection::center_about_origin;
    use geo_types::Geometry;
    let (centered, offset) = center_about_origin(&Geometry::Polygon(polygon.clone()));
    match centered {
        Geometry::Polygon(p) => (p, offset),
        _ => unreachable!("centering a Polygon always yields a Polygon"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    fn square(side: f64) -> Polygon<f64> {
        let h = side / 2.0;
        Polygon::new(
            LineString::new(vec![
                coord! {x: -h, y: -h},
                coord! {x: h, y: -h},
                coord! {x: h, y: h},
                coord! {x: -h, y: h},
                coord! {x: -h, y: -h},
            ]),
            vec![],
        )
    }

    #[test]
    fn import_centers_the_field() {
        let s = square(100.0);
        let (field, warnings) = Field::import_polygon(&s, "EPSG:32615").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(field.centroid_offset(), (0.0, 0.0));
        assert!((field.area_m2() - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn import_rejects_undersized_field() {
        let tiny = square(10.0);
        let err = Field::import_polygon(&tiny, "EPSG:32615").unwrap_err();
        assert!(matches!(err, InvalidInput::AreaTooSmall { .. }));
    }

    #[test]
    fn multi_polygon_keeps_largest() {
        let big = square(200.0);
        let mut small = square(10.0);
        use geo::Translate;
        small = small.translate(1000.0, 1000.0);
        let multi = MultiPolygon::new(vec![big, small]);
        let (_, warnings) = Field::import_multi_polygon(&multi, "EPSG:32615").unwrap();
        assert!(warnings.contains(&Warning::MultiPolygonKeptLargest));
    }
}
