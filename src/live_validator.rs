//! Live (pre-carve) validation: while a visitor is still placing a set
//! of design elements, check them against each other, the carved area
//! so far, and the field edge — cheaply enough to run every frame — and
//! offer a single best-effort auto-fix pass.

use crate::constraints::{closest_points_on_segments, nearest_points_between_linestrings, ConstraintConfig, Severity, Violation, ViolationKind};
use crate::field::Field;
use crate::geometry::buffer::round_export_buffer;
use crate::geometry::ops;
use crate::geometry::repair::ensure_valid;
use geo::{BooleanOps, Centroid, EuclideanDistance, Intersects};
use geo_types::{coord, Coord, LineString, MultiPolygon, Polygon};

/// The kind of a pending design element, mirroring the carve engine's
/// own vocabulary. `is_closed` decides which geometry rule applies:
/// closed kinds (and text/clipart) are raw polygons, open kinds are
/// polylines buffered by `width / 2` with round caps — exactly the
/// geometry the carve engine itself would produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Path,
    Polygon,
    Text,
    Clipart,
    Circle,
    Rectangle,
    Line,
    Arc,
}

impl PendingKind {
    fn is_closed(self) -> bool {
        matches!(self, PendingKind::Polygon | PendingKind::Text | PendingKind::Clipart | PendingKind::Circle | PendingKind::Rectangle)
    }
}

/// A not-yet-committed design element awaiting validation.
#[derive(Debug, Clone)]
pub struct PendingElement {
    pub id: u64,
    pub kind: PendingKind,
    pub points: LineString<f64>,
    pub width: f64,
    pub rotation: Option<f64>,
}

impl PendingElement {
    fn is_closed(&self) -> bool {
        self.kind.is_closed()
    }

    /// The geometry the carve engine would apply for this element: a raw
    /// polygon for closed kinds, a round-capped stroke buffer otherwise.
    fn geometry(&self) -> MultiPolygon<f64> {
        if self.is_closed() {
            let mut ring = self.points.clone();
            if ring.0.first() != ring.0.last() {
                ring.0.push(ring.0[0]);
            }
            let polygon = Polygon::new(ring, vec![]);
            ensure_valid(&polygon).unwrap_or_else(|_| MultiPolygon::new(vec![polygon]))
        } else {
            round_export_buffer(&self.points, self.width / 2.0)
        }
    }
}

/// Result of validating a pending element set: the violations found, and
/// (when any were found) the translations [`auto_fix`] computed to cure
/// them in a single best-effort pass.
#[derive(Debug, Clone)]
pub struct LiveCheckResult {
    pub violations: Vec<Violation>,
    pub nudges: Vec<Nudge>,
}

/// A translation suggested for one pending element by [`auto_fix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nudge {
    pub element_id: u64,
    pub dx: f64,
    pub dy: f64,
}

const OVERLAP_EPSILON: f64 = 1e-9;

/// Check a list of pending elements against one another, the carved area
/// accumulated so far, and the field edge, then run the best-effort
/// auto-fixer if anything was found.
pub fn check_pending(
    elements: &[PendingElement],
    field: &Field,
    carved_area: &MultiPolygon<f64>,
    config: &ConstraintConfig,
) -> LiveCheckResult {
    let mut violations = Vec::new();
    violations.extend(pairwise_wall_width(elements, config));
    violations.extend(wall_width_against_carved(elements, carved_area, config));
    violations.extend(edge_buffer(elements, field, config));

    let nudges = if violations.is_empty() { Vec::new() } else { auto_fix(elements, &violations, field, carved_area, config) };
    LiveCheckResult { violations, nudges }
}

fn overlap_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    use geo::Area;
    let overlap = a.intersection(b);
    if overlap.unsigned_area() > OVERLAP_EPSILON {
        Some(overlap)
    } else {
        None
    }
}

fn centroid_of(geom: &MultiPolygon<f64>) -> Coord<f64> {
    geom.centroid().map(|p| p.0).unwrap_or(coord! {x: 0.0, y: 0.0})
}

fn pairwise_wall_width(elements: &[PendingElement], config: &ConstraintConfig) -> Vec<Violation> {
    let mut out = Vec::new();
    for i in 0..elements.len() {
        for j in (i + 1)..elements.len() {
            let (a, b) = (&elements[i], &elements[j]);
            if let Some(v) = check_pair(a, b, config) {
                out.push(v);
            }
        }
    }
    out
}

fn check_pair(a: &PendingElement, b: &PendingElement, config: &ConstraintConfig) -> Option<Violation> {
    if !a.is_closed() && !b.is_closed() {
        // Two open strokes: a crossing centerline is a valid junction,
        // not a violation.
        if a.points.intersects(&b.points) {
            return None;
        }
        let geom_a = a.geometry();
        let geom_b = b.geometry();
        let (centerline_dist, nearest_mid) = nearest_points_between_linestrings(&a.points, &b.points);

        if let Some(overlap) = overlap_area(&geom_a, &geom_b) {
            if centerline_dist < config.min_wall_width {
                let centroid = centroid_of(&overlap);
                return Some(Violation {
                    kind: ViolationKind::WallTooThin,
                    severity: Severity::Error,
                    message: format!("strokes cross with only {centerline_dist:.2} m of clearance, short of the {:.2} m minimum", config.min_wall_width),
                    location: (centroid.x, centroid.y),
                    actual_value: 0.0,
                    required_value: config.min_wall_width,
                    highlight: Some(overlap),
                    element_ids: Some(vec![a.id, b.id]),
                });
            }
            return None;
        }
        if centerline_dist < config.min_wall_width {
            return Some(Violation {
                kind: ViolationKind::WallTooThin,
                severity: Severity::Error,
                message: format!("strokes pass within {centerline_dist:.2} m of each other, short of the {:.2} m minimum", config.min_wall_width),
                location: (nearest_mid.x, nearest_mid.y),
                actual_value: centerline_dist,
                required_value: config.min_wall_width,
                highlight: None,
                element_ids: Some(vec![a.id, b.id]),
            });
        }
        return None;
    }

    // At least one element is a closed polygon (or text/clipart): compare
    // the actual polygon geometries directly.
    let geom_a = a.geometry();
    let geom_b = b.geometry();
    if let Some(overlap) = overlap_area(&geom_a, &geom_b) {
        let centroid = centroid_of(&overlap);
        return Some(Violation {
            kind: ViolationKind::WallTooThin,
            severity: Severity::Error,
            message: "elements overlap".to_string(),
            location: (centroid.x, centroid.y),
            actual_value: 0.0,
            required_value: config.min_wall_width,
            highlight: Some(overlap),
            element_ids: Some(vec![a.id, b.id]),
        });
    }
    let distance = geom_a.euclidean_distance(&geom_b);
    if distance < config.min_wall_width {
        let ca = centroid_of(&geom_a);
        let cb = centroid_of(&geom_b);
        let mid = coord! {x: (ca.x + cb.x) / 2.0, y: (ca.y + cb.y) / 2.0};
        return Some(Violation {
            kind: ViolationKind::WallTooThin,
            severity: Severity::Error,
            message: format!("elements are {distance:.2} m apart, short of the {:.2} m minimum wall width", config.min_wall_width),
            location: (mid.x, mid.y),
            actual_value: distance,
            required_value: config.min_wall_width,
            highlight: None,
            element_ids: Some(vec![a.id, b.id]),
        });
    }
    None
}

fn wall_width_against_carved(elements: &[PendingElement], carved_area: &MultiPolygon<f64>, config: &ConstraintConfig) -> Vec<Violation> {
    if carved_area.0.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for element in elements {
        let geom = element.geometry();
        if let Some(overlap) = overlap_area(&geom, carved_area) {
            let centroid = centroid_of(&overlap);
            out.push(Violation {
                kind: ViolationKind::WallTooThin,
                severity: Severity::Error,
                message: "overlaps with existing carved path".to_string(),
                location: (centroid.x, centroid.y),
                actual_value: 0.0,
                required_value: config.min_wall_width,
                highlight: Some(overlap),
                element_ids: Some(vec![element.id]),
            });
            continue;
        }
        let distance = geom.euclidean_distance(carved_area);
        if distance < config.min_wall_width {
            let centroid = centroid_of(&geom);
            out.push(Violation {
                kind: ViolationKind::WallTooThin,
                severity: Severity::Error,
                message: format!("element is {distance:.2} m from existing carved path, short of the {:.2} m minimum", config.min_wall_width),
                location: (centroid.x, centroid.y),
                actual_value: distance,
                required_value: config.min_wall_width,
                highlight: None,
                element_ids: Some(vec![element.id]),
            });
        }
    }
    out
}

fn edge_buffer(elements: &[PendingElement], field: &Field, config: &ConstraintConfig) -> Vec<Violation> {
    let inset = crate::geometry::buffer::internal_buffer(&field.polygon(), -config.edge_buffer);
    let field_exterior = field.polygon().exterior().clone();
    let mut out = Vec::new();
    for element in elements {
        let geom = element.geometry();
        let outside = match ops::difference(&geom, &inset) {
            Ok(o) => o,
            Err(_) => continue,
        };
        if outside.0.is_empty() {
            continue;
        }
        let distance = geom.euclidean_distance(&field_exterior);
        let centroid = centroid_of(&outside);
        out.push(Violation {
            kind: ViolationKind::EdgeBufferViolated,
            severity: Severity::Error,
            message: format!("element runs within the {:.2} m field edge buffer", config.edge_buffer),
            location: (centroid.x, centroid.y),
            actual_value: distance,
            required_value: config.edge_buffer,
            highlight: Some(outside),
            element_ids: Some(vec![element.id]),
        });
    }
    out
}

/// A single best-effort pass that translates elements to cure the
/// violations just found. Heuristic and non-recursive: it does not
/// re-validate, and the caller should re-check after applying the
/// nudges to see whether the design converged.
pub fn auto_fix(elements: &[PendingElement], violations: &[Violation], field: &Field, carved_area: &MultiPolygon<f64>, config: &ConstraintConfig) -> Vec<Nudge> {
    let mut nudges: Vec<Nudge> = Vec::new();
    let centroid_by_id = |id: u64| -> Coord<f64> {
        elements.iter().find(|e| e.id == id).map(|e| centroid_of(&e.geometry())).unwrap_or(coord! {x: 0.0, y: 0.0})
    };

    for v in violations {
        let Some(ids) = &v.element_ids else { continue };
        let overlap = v.actual_value <= OVERLAP_EPSILON;

        match (v.kind, ids.as_slice()) {
            (ViolationKind::EdgeBufferViolated, [id]) => {
                let field_centroid = field.polygon().centroid().map(|p| p.0).unwrap_or(coord! {x: 0.0, y: 0.0});
                let element_centroid = centroid_by_id(*id);
                let (dx, dy) = unit_direction(element_centroid, field_centroid);
                let amount = (v.required_value - v.actual_value + 0.5).max(0.0);
                nudges.push(Nudge { element_id: *id, dx: dx * amount, dy: dy * amount });
            }
            (ViolationKind::WallTooThin, [id]) => {
                // Element vs. carved state: push away from the carved
                // area's centroid.
                let carved_centroid = carved_area.centroid().map(|p| p.0).unwrap_or(coord! {x: 0.0, y: 0.0});
                let element_centroid = centroid_by_id(*id);
                let (dx, dy) = if distance(element_centroid, carved_centroid) < 0.01 {
                    (std::f64::consts::FRAC_1_SQRT_2, std::f64::consts::FRAC_1_SQRT_2)
                } else {
                    unit_direction(carved_centroid, element_centroid)
                };
                let amount = if overlap { config.min_wall_width + 0.5 } else { (config.min_wall_width - v.actual_value) + 0.25 };
                nudges.push(Nudge { element_id: *id, dx: dx * amount, dy: dy * amount });
            }
            (ViolationKind::WallTooThin, [id_a, id_b]) => {
                let ca = centroid_by_id(*id_a);
                let cb = centroid_by_id(*id_b);
                let (dx, dy) = unit_direction(ca, cb);
                let amount = if overlap { config.min_wall_width / 2.0 + 0.5 } else { (config.min_wall_width - v.actual_value) / 2.0 + 0.25 };
                nudges.push(Nudge { element_id: *id_a, dx: -dx * amount, dy: -dy * amount });
                nudges.push(Nudge { element_id: *id_b, dx: dx * amount, dy: dy * amount });
            }
            _ => {}
        }
    }
    nudges
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Unit vector pointing from `from` toward `to`; degenerate (coincident)
/// inputs fall back to the positive-x axis rather than producing NaN.
fn unit_direction(from: Coord<f64>, to: Coord<f64>) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        (1.0, 0.0)
    } else {
        (dx / len, dy / len)
    }
}
