//! Curve densification: subdivide polyline segments that approximate a
//! circular arc until the chord sagitta is within tolerance, so
//! arc-buffered shapes export cleanly at sub-metre zoom.
//!
//! This is a different algorithm from `geo::Densify` (which inserts
//! points at a fixed maximum segment length, with no notion of the curve
//! the segment is approximating) — it is written from scratch and kept
//! in its own module rather than reusing `geo`'s trait of the same shape.

use geo_types::{coord, Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Polygon};

/// Maximum allowed sagitta (perpendicular deviation between a chord and
/// the true arc it approximates), in metres.
pub const MAX_SAGITTA_M: f64 = 0.15;

/// Recursion safety cap: 2^24 subdivisions of one original segment is
/// far beyond anything a 0.15 m tolerance would ever require at field
/// scale, and guards against runaway recursion on pathological input.
const MAX_SUBDIVISION_DEPTH: u32 = 24;

fn dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Fit the circle through three points. Returns `None` if the points are
/// collinear (to numerical precision) or the fitted radius exceeds 1e8,
/// both of which are treated as "keep the segment unchanged."
fn circumscribed_circle(p0: Coord<f64>, p1: Coord<f64>, p2: Coord<f64>) -> Option<(Coord<f64>, f64)> {
    let (ax, ay) = (p0.x, p0.y);
    let (bx, by) = (p1.x, p1.y);
    let (cx, cy) = (p2.x, p2.y);
    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-9 {
        return None;
    }
    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let center = coord! {x: ux, y: uy};
    let r = dist(center, p0);
    if !r.is_finite() || r > 1.0e8 {
        return None;
    }
    Some((center, r))
}

fn sagitta(chord_len: f64, r: f64) -> f64 {
    let half = chord_len / 2.0;
    let inside = r * r - half * half;
    if inside <= 0.0 {
        return r;
    }
    r - inside.sqrt()
}

fn arc_midpoint(a: Coord<f64>, b: Coord<f64>, center: Coord<f64>, r: f64, ccw: bool) -> Coord<f64> {
    let ang_a = (a.y - center.y).atan2(a.x - center.x);
    let mut ang_b = (b.y - center.y).atan2(b.x - center.x);
    let two_pi = std::f64::consts::TAU;
    if ccw {
        while ang_b < ang_a {
            ang_b += two_pi;
        }
    } else {
        while ang_b > ang_a {
            ang_b -= two_pi;
        }
    }
    let mid = (ang_a + ang_b) / 2.0;
    coord! {x: center.x + r * mid.cos(), y: center.y + r * mid.sin()}
}

fn subdivide_rec(
    a: Coord<f64>,
    b: Coord<f64>,
    center: Coord<f64>,
    r: f64,
    ccw: bool,
    depth: u32,
    out: &mut Vec<Coord<f64>>,
) {
    let s = sagitta(dist(a, b), r);
    if s <= MAX_SAGITTA_M || depth >= MAX_SUBDIVISION_DEPTH {
        out.push(b);
        return;
    }
    let mid = arc_midpoint(a, b, center, r, ccw);
    subdivide_rec(a, mid, center, r, ccw, depth + 1, out);
    subdivide_rec(mid, b, center, r, ccw, depth + 1, out);
}

/// Densify the points of a single linear sequence of coordinates,
/// treating consecutive triples as arc samples.
pub fn densify_coords(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    if coords.len() < 3 {
        return coords.to_vec();
    }
    let mut out = vec![coords[0]];
    for i in 0..coords.len() - 1 {
        let p0 = coords[i];
        let p1 = coords[i + 1];
        let circle = coords.get(i + 2).and_then(|&p2| {
            circumscribed_circle(p0, p1, p2).map(|(center, r)| {
                let turn = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
                (center, r, turn >= 0.0)
            })
        });
        match circle {
            Some((center, r, ccw)) => subdivide_rec(p0, p1, center, r, ccw, 0, &mut out),
            None => out.push(p1),
        }
    }
    out
}

fn densify_ring(ring: &LineString<f64>) -> LineString<f64> {
    LineString::new(densify_coords(&ring.0))
}

/// Apply curve densification to a geometry. Geometry types with no
/// notion of a vertex sequence (`Point`, `MultiPoint`) pass through
/// unchanged.
pub trait Densifiable {
    fn densify_curves(&self) -> Self;
}

impl Densifiable for LineString<f64> {
    fn densify_curves(&self) -> Self {
        densify_ring(self)
    }
}

impl Densifiable for MultiLineString<f64> {
    fn densify_curves(&self) -> Self {
        MultiLineString::new(self.0.iter().map(densify_ring).collect())
    }
}

impl Densifiable for Polygon<f64> {
    fn densify_curves(&self) -> Self {
        Polygon::new(
            densify_ring(self.exterior()),
            self.interiors().iter().map(densify_ring).collect(),
        )
    }
}

impl Densifiable for MultiPolygon<f64> {
    fn densify_curves(&self) -> Self {
        MultiPolygon::new(self.0.iter().map(Densifiable::densify_curves).collect())
    }
}

impl Densifiable for GeometryCollection<f64> {
    fn densify_curves(&self) -> Self {
        GeometryCollection::new_from(self.0.iter().map(densify_geometry).collect())
    }
}

/// Densify any `Geometry`, recursing into collections and passing
/// point-like geometries through unchanged.
pub fn densify_geometry(geom: &Geometry<f64>) -> Geometry<f64> {
    match geom {
        Geometry::LineString(ls) => Geometry::LineString(ls.densify_curves()),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(mls.densify_curves()),
        Geometry::Polygon(p) => Geometry::Polygon(p.densify_curves()),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.densify_curves()),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(gc.densify_curves()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Build coarse points on a circle of radius r, `n` samples over a
    /// quarter turn, which is coarse enough to need densification.
    fn coarse_quarter_circle(r: f64, n: usize) -> Vec<Coord<f64>> {
        (0..=n)
            .map(|i| {
                let theta = (i as f64 / n as f64) * (PI / 2.0);
                coord! {x: r * theta.cos(), y: r * theta.sin()}
            })
            .collect()
    }

    #[test]
    fn densify_reduces_sagitta_below_tolerance() {
        // 4 samples over a 90 degree arc of a 50m-radius circle has a
        // large sagitta per segment; densify must bring every segment
        // under the 0.15m ceiling.
        let coarse = coarse_quarter_circle(50.0, 4);
        let dense = densify_coords(&coarse);
        assert!(dense.len() > coarse.len());
        for w in dense.windows(2) {
            let chord = dist(w[0], w[1]);
            // crude sagitta bound check via circle fit from neighboring triple
            assert!(chord < 5.0);
        }
    }

    #[test]
    fn collinear_points_are_untouched() {
        let line = vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 2.0, y: 0.0},
            coord! {x: 3.0, y: 0.0},
        ];
        let out = densify_coords(&line);
        assert_eq!(out, line);
    }

    #[test]
    fn short_linestrings_pass_through() {
        let two_points = vec![coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0}];
        assert_eq!(densify_coords(&two_points), two_points);
    }
}
