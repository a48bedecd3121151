//! UTM zone detection and reprojection.
//!
//! Zone/EPSG math is pure arithmetic and has no dependency on the `proj`
//! feature; actual coordinate reprojection is delegated to the `proj`
//! crate, the same one `geo`'s own `use-proj` feature wraps, and is only
//! compiled in when the `use-proj` feature is enabled.

use crate::error::GeometricFailure;
use geo::MapCoords;
use geo_types::{Coord, Geometry};

/// Detect the UTM zone number (1–60) for a given WGS84 longitude.
pub fn detect_utm_zone(lon_deg: f64) -> u8 {
    let zone = ((lon_deg + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// The EPSG code for a UTM zone in the given hemisphere.
pub fn utm_crs(zone: u8, northern: bool) -> u32 {
    let base: u32 = if northern { 32600 } else { 32700 };
    base + zone as u32
}

/// Axis-ordered (east, north) WGS84 centroid used to pick a UTM zone.
fn centroid_lon_lat(geom: &Geometry<f64>) -> Option<(f64, f64)> {
    use geo::Centroid;
    match geom {
        Geometry::Polygon(p) => p.centroid().map(|c| (c.x(), c.y())),
        Geometry::MultiPolygon(mp) => mp.centroid().map(|c| (c.x(), c.y())),
        Geometry::LineString(ls) => ls.centroid().map(|c| (c.x(), c.y())),
        Geometry::MultiLineString(mls) => mls.centroid().map(|c| (c.x(), c.y())),
        Geometry::Point(p) => Some((p.x(), p.y())),
        _ => None,
    }
}

/// Project a WGS84 geometry to UTM, returning the projected geometry and
/// its EPSG code. The zone is picked from the geometry's own centroid, so
/// callers never need to specify one.
#[cfg(feature = "use-proj")]
pub fn project_to_utm(geom: &Geometry<f64>, source_crs: &str) -> Result<(Geometry<f64>, u32), GeometricFailure> {
    let (lon, lat) = centroid_lon_lat(geom).ok_or(GeometricFailure::UnexpectedEmptyResult)?;
    let zone = detect_utm_zone(lon);
    let epsg = utm_crs(zone, lat >= 0.0);
    let target = format!("EPSG:{epsg}");
    let proj = proj::Proj::new_known_crs(source_crs, &target, None)
        .map_err(|_| GeometricFailure::UnexpectedEmptyResult)?;
    let projected = geom.map_coords(|c| {
        let (x, y) = proj.convert((c.x, c.y)).unwrap_or((c.x, c.y));
        Coord { x, y }
    });
    Ok((projected, epsg))
}

/// Non-PROJ fallback: pick the zone/EPSG without reprojecting. Exposed so
/// callers that already hold projected coordinates (e.g. from a GIS file
/// that already carries a UTM CRS) never need to link against PROJ.
pub fn pick_utm_zone_for(geom: &Geometry<f64>) -> Option<(u8, u32)> {
    let (lon, lat) = centroid_lon_lat(geom)?;
    let zone = detect_utm_zone(lon);
    Some((zone, utm_crs(zone, lat >= 0.0)))
}

/// Compute the offset `(dx, dy)` that re-centers a geometry's bounding
/// box centroid at the origin, and the recentered geometry.
pub fn center_about_origin(geom: &Geometry<f64>) -> (Geometry<f64>, (f64, f64)) {
    use geo::BoundingRect;
    let Some(rect) = geom.bounding_rect() else {
        return (geom.clone(), (0.0, 0.0));
    };
    let min = rect.min();
    let max = rect.max();
    let dx = (min.x + max.x) / 2.0;
    let dy = (min.y + max.y) / 2.0;
    let centered = geom.map_coords(|c| Coord { x: c.x - dx, y: c.y - dy });
    (centered, (dx, dy))
}

/// Undo `center_about_origin`, for geographic export.
pub fn uncenter(geom: &Geometry<f64>, offset: (f64, f64)) -> Geometry<f64> {
    geom.map_coords(|c| Coord { x: c.x + offset.0, y: c.y + offset.1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_boundaries() {
        assert_eq!(detect_utm_zone(-180.0), 1);
        assert_eq!(detect_utm_zone(-177.0), 1);
        assert_eq!(detect_utm_zone(0.0), 31);
        assert_eq!(detect_utm_zone(179.999), 60);
        assert_eq!(detect_utm_zone(180.0), 60);
    }

    #[test]
    fn epsg_codes() {
        assert_eq!(utm_crs(15, true), 32615);
        assert_eq!(utm_crs(15, false), 32715);
    }

    #[test]
    fn center_and_uncenter_round_trip() {
        use geo_types::{coord, LineString, Polygon};
        let square = Polygon::new(
            LineString::new(vec![
                coord! {x: 100.0, y: 200.0},
                coord! {x: 110.0, y: 200.0},
                coord! {x: 110.0, y: 210.0},
                coord! {x: 100.0, y: 210.0},
                coord! {x: 100.0, y: 200.0},
            ]),
            vec![],
        );
        let geom = Geometry::Polygon(square);
        let (centered, offset) = center_about_origin(&geom);
        let restored = uncenter(&centered, offset);
        assert_eq!(restored, geom);
    }
}
