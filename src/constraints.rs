//! Finished-maze constraint checking: after row generation settles,
//! verify every corridor is wide enough, every wall thick enough, the
//! layout respects the field's edge buffer, and no dead end runs too
//! long.

use crate::error::GeometricFailure;
use crate::field::Field;
use crate::geometry::buffer::internal_buffer;
use crate::metrics::build_graph_with_tolerance;
use crate::rows::RowSet;
use geo::{BooleanOps, BoundingRect, Contains, EuclideanDistance, LineInterpolatePoint};
use geo_types::{coord, Coord, Line, LineString, MultiPolygon, Point};

/// Tunable thresholds for the finished-maze checks. Defaults match the
/// values a typical corn-maze operator uses for a walk-behind mower path.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConstraintConfig {
    pub min_path_width: f64,
    pub min_wall_width: f64,
    pub inter_path_buffer: f64,
    pub edge_buffer: f64,
    pub max_dead_end_length: f64,
    pub corn_row_spacing: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        ConstraintConfig {
            min_path_width: 2.4,
            min_wall_width: 2.0,
            inter_path_buffer: 4.6,
            edge_buffer: 3.0,
            max_dead_end_length: 50.0,
            corn_row_spacing: 0.762,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ViolationKind {
    PathTooNarrow,
    WallTooThin,
    EdgeBufferViolated,
    InterPathBufferViolated,
    DeadEndTooLong,
}

/// A single finding from the constraint checker or the live validator.
/// `highlight` carries the offending region when one was computed (e.g.
/// the intersection polygon of two overlapping elements); `element_ids`
/// names the pending elements involved, when the check came from
/// [`crate::live_validator`] rather than the finished-maze pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    pub location: (f64, f64),
    pub actual_value: f64,
    pub required_value: f64,
    pub highlight: Option<MultiPolygon<f64>>,
    pub element_ids: Option<Vec<u64>>,
}

impl Violation {
    fn simple(kind: ViolationKind, severity: Severity, message: String, location: Coord<f64>, actual_value: f64, required_value: f64) -> Self {
        Violation { kind, severity, message, location: (location.x, location.y), actual_value, required_value, highlight: None, element_ids: None }
    }
}

const MAX_VIOLATIONS_PER_KIND: usize = 200;
const PATH_SAMPLE_SPACING_M: f64 = 3.0;
const ROW_BUFFER_FLOOR_M: f64 = 0.1;
const WALL_PAIR_WINDOW: usize = 50;
const EDGE_BUFFER_MAX_PIECES: usize = 10;
const EDGE_BUFFER_MAX_TOTAL: usize = 20;
const DEAD_END_SNAP_TOLERANCE_M: f64 = 0.5;

/// The closest pair of points between two finite segments, via the
/// standard clamped-parametric projection (no crate in the dependency
/// stack exposes line-to-line nearest points directly).
pub(crate) fn closest_points_on_segments(a: Line<f64>, b: Line<f64>) -> (Coord<f64>, Coord<f64>) {
    let d1 = coord! {x: a.end.x - a.start.x, y: a.end.y - a.start.y};
    let d2 = coord! {x: b.end.x - b.start.x, y: b.end.y - b.start.y};
    let r = coord! {x: a.start.x - b.start.x, y: a.start.y - b.start.y};

    let dot11 = d1.x * d1.x + d1.y * d1.y;
    let dot22 = d2.x * d2.x + d2.y * d2.y;
    let dot12 = d1.x * d2.x + d1.y * d2.y;
    let dot1r = d1.x * r.x + d1.y * r.y;
    let dot2r = d2.x * r.x + d2.y * r.y;

    let denom = dot11 * dot22 - dot12 * dot12;
    let mut s = if denom.abs() > 1e-12 { ((dot12 * dot2r - dot22 * dot1r) / denom).clamp(0.0, 1.0) } else { 0.0 };

    let compute_t = |s: f64| -> f64 {
        if dot22 > 1e-12 {
            ((dot12 * s + dot2r) / dot22).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };
    let mut t = compute_t(s);
    if dot11 > 1e-12 {
        s = ((dot12 * t - dot1r) / dot11).clamp(0.0, 1.0);
    }
    t = compute_t(s);

    let closest_a = coord! {x: a.start.x + s * d1.x, y: a.start.y + s * d1.y};
    let closest_b = coord! {x: b.start.x + t * d2.x, y: b.start.y + t * d2.y};
    (closest_a, closest_b)
}

/// The shortest distance between two linestrings, and the midpoint of
/// the nearest pair of points that achieves it.
pub(crate) fn nearest_points_between_linestrings(a: &LineString<f64>, b: &LineString<f64>) -> (f64, Coord<f64>) {
    let mut best_dist = f64::INFINITY;
    let mut best_mid = coord! {x: 0.0, y: 0.0};
    for seg_a in a.lines() {
        for seg_b in b.lines() {
            let (pa, pb) = closest_points_on_segments(seg_a, seg_b);
            let dx = pa.x - pb.x;
            let dy = pa.y - pb.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < best_dist {
                best_dist = dist;
                best_mid = coord! {x: (pa.x + pb.x) / 2.0, y: (pa.y + pb.y) / 2.0};
            }
        }
    }
    (best_dist, best_mid)
}

/// Run every finished-maze check in a fixed order (narrow paths, thin
/// walls, edge buffer, inter-path buffer, dead ends) and concatenate
/// their violations.
pub fn validate(field: &Field, rows: &RowSet, config: &ConstraintConfig) -> Result<Vec<Violation>, GeometricFailure> {
    let mut violations = Vec::new();
    violations.extend(path_too_narrow(field, rows, config));
    violations.extend(wall_too_thin(rows, config));
    violations.extend(edge_buffer_violation(field, rows, config));
    violations.extend(inter_path_buffer_violation(rows, config));
    violations.extend(dead_end_too_long(rows, config));
    Ok(violations)
}

fn path_too_narrow(field: &Field, rows: &RowSet, config: &ConstraintConfig) -> Vec<Violation> {
    let mut out = Vec::new();
    let polygon = field.polygon();
    let Some(bounds) = polygon.bounding_rect() else { return out };
    if rows.0 .0.is_empty() {
        return out;
    }

    let mut y = bounds.min().y;
    'rows: while y <= bounds.max().y {
        let mut x = bounds.min().x;
        while x <= bounds.max().x {
            let sample = Point::new(x, y);
            if Contains::contains(&polygon, &sample) {
                let d = sample.euclidean_distance(&rows.0);
                if d > ROW_BUFFER_FLOOR_M && d < config.min_path_width / 2.0 {
                    out.push(Violation::simple(
                        ViolationKind::PathTooNarrow,
                        Severity::Warning,
                        format!("path corridor is only {:.2} m wide, short of the {:.2} m minimum", 2.0 * d, config.min_path_width),
                        sample.0,
                        2.0 * d,
                        config.min_path_width,
                    ));
                    if out.len() >= MAX_VIOLATIONS_PER_KIND {
                        break 'rows;
                    }
                }
            }
            x += PATH_SAMPLE_SPACING_M;
        }
        y += PATH_SAMPLE_SPACING_M;
    }
    out
}

/// Iterate windowed pairs of row segments and flag any pair that leaves
/// less than `min_wall_width` of standing corn between them.
fn wall_too_thin(rows: &RowSet, config: &ConstraintConfig) -> Vec<Violation> {
    windowed_pair_check(
        rows,
        0.0,
        config.min_wall_width,
        ViolationKind::WallTooThin,
        Severity::Error,
        |dist, required| format!("standing corn here is only {dist:.2} m thick, short of the {required:.2} m minimum wall width"),
        config,
    )
}

/// Same structural check as [`wall_too_thin`] at the larger inter-path
/// threshold, only firing above `min_wall_width` (that tighter range is
/// `wall_too_thin`'s to report) and naming the implied row count.
fn inter_path_buffer_violation(rows: &RowSet, config: &ConstraintConfig) -> Vec<Violation> {
    windowed_pair_check(
        rows,
        config.min_wall_width,
        config.inter_path_buffer,
        ViolationKind::InterPathBufferViolated,
        Severity::Warning,
        |dist, required| {
            let rows_between = (dist / config.corn_row_spacing).floor() as i64;
            format!(
                "parallel paths are {dist:.2} m apart, inside the {required:.2} m inter-path buffer ({rows_between} standing rows between them)"
            )
        },
        config,
    )
}

fn windowed_pair_check(
    rows: &RowSet,
    floor: f64,
    threshold: f64,
    kind: ViolationKind,
    severity: Severity,
    message: impl Fn(f64, f64) -> String,
    _config: &ConstraintConfig,
) -> Vec<Violation> {
    let mut out = Vec::new();
    let lines = &rows.0 .0;
    for i in 0..lines.len() {
        let upper = (i + WALL_PAIR_WINDOW).min(lines.len());
        for j in (i + 1)..upper {
            let (dist, mid) = nearest_points_between_linestrings(&lines[i], &lines[j]);
            if dist > floor && dist < threshold {
                out.push(Violation::simple(kind, severity, message(dist, threshold), mid, dist, threshold));
                if out.len() >= MAX_VIOLATIONS_PER_KIND {
                    return out;
                }
            }
        }
    }
    out
}

/// No standing-row geometry may fall within `edge_buffer` of the field
/// boundary: clip the rows against an inset of the field and flag every
/// offending piece (capped).
fn edge_buffer_violation(field: &Field, rows: &RowSet, config: &ConstraintConfig) -> Vec<Violation> {
    let inset = internal_buffer(&field.polygon(), -config.edge_buffer);
    let outside = inset.clip(&rows.0, true);

    let mut out = Vec::new();
    let mut distinct_pieces = 0;
    for piece in &outside.0 {
        if piece.0.len() < 2 {
            continue;
        }
        if distinct_pieces >= EDGE_BUFFER_MAX_PIECES || out.len() >= EDGE_BUFFER_MAX_TOTAL {
            break;
        }
        let midpoint = piece.line_interpolate_point(0.5).map(|p| p.0).unwrap_or_else(|| piece.0[0]);
        out.push(Violation::simple(
            ViolationKind::EdgeBufferViolated,
            Severity::Warning,
            format!("standing-row geometry runs within the {:.2} m field edge buffer", config.edge_buffer),
            midpoint,
            0.0,
            config.edge_buffer,
        ));
        distinct_pieces += 1;
    }
    out
}

/// Snap row endpoints to a `DEAD_END_SNAP_TOLERANCE_M` grid, build the
/// undirected multigraph, and walk from every degree-1 node through
/// degree-2 chains until reaching a junction or another dead end. Flag
/// any walk whose accumulated length exceeds `max_dead_end_length`.
fn dead_end_too_long(rows: &RowSet, config: &ConstraintConfig) -> Vec<Violation> {
    let graph = build_graph_with_tolerance(rows, DEAD_END_SNAP_TOLERANCE_M);
    let adjacency = graph.adjacency();
    let mut out = Vec::new();

    for (start_idx, node) in graph.nodes.iter().enumerate() {
        if node.degree != 1 {
            continue;
        }
        let mut accumulated = 0.0;
        let mut previous = start_idx;
        let mut current = start_idx;
        loop {
            let Some(&(next, edge_idx)) = adjacency[current].iter().find(|&&(n, _)| n != previous || adjacency[current].len() == 1) else {
                break;
            };
            accumulated += graph.edges[edge_idx].2;
            previous = current;
            current = next;
            if graph.nodes[current].degree != 2 {
                break;
            }
        }

        if accumulated > config.max_dead_end_length {
            out.push(Violation::simple(
                ViolationKind::DeadEndTooLong,
                Severity::Warning,
                format!("dead end runs {:.1} m, past the {:.1} m guideline", accumulated, config.max_dead_end_length),
                node.position,
                accumulated,
                config.max_dead_end_length,
            ));
            if out.len() >= MAX_VIOLATIONS_PER_KIND {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, MultiLineString, Polygon as GPolygon};

    fn square_field(side: f64) -> Field {
        let h = side / 2.0;
        let poly = GPolygon::new(
            LineString::new(vec![
                coord! {x: -h, y: -h},
                coord! {x: h, y: -h},
                coord! {x: h, y: h},
                coord! {x: -h, y: h},
                coord! {x: -h, y: -h},
            ]),
            vec![],
        );
        Field::import_polygon(&poly, "EPSG:32615").unwrap().0
    }

    fn rows_from(lines: Vec<Vec<Coord<f64>>>) -> RowSet {
        RowSet(MultiLineString::new(lines.into_iter().map(LineString::new).collect()))
    }

    #[test]
    fn empty_rows_have_no_violations() {
        let field = square_field(100.0);
        let rows = RowSet::default();
        let config = ConstraintConfig::default();
        let violations = validate(&field, &rows, &config).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn rows_hugging_the_edge_are_flagged() {
        let field = square_field(40.0);
        let rows = rows_from(vec![vec![coord! {x: -19.5, y: -19.0}, coord! {x: -19.5, y: 19.0}]]);
        let config = ConstraintConfig::default();
        let violations = validate(&field, &rows, &config).unwrap();
        assert!(violations.iter().any(|v| v.kind == ViolationKind::EdgeBufferViolated));
    }

    #[test]
    fn two_rows_closer_than_min_wall_width_are_flagged() {
        let field = square_field(100.0);
        let rows = rows_from(vec![
            vec![coord! {x: -20.0, y: 0.0}, coord! {x: 20.0, y: 0.0}],
            vec![coord! {x: -20.0, y: 1.0}, coord! {x: 20.0, y: 1.0}],
        ]);
        let config = ConstraintConfig::default();
        let violations = validate(&field, &rows, &config).unwrap();
        assert!(violations.iter().any(|v| v.kind == ViolationKind::WallTooThin));
    }

    #[test]
    fn long_dead_end_row_is_flagged() {
        let field = square_field(200.0);
        let rows = rows_from(vec![vec![coord! {x: 0.0, y: 0.0}, coord! {x: 0.0, y: 80.0}]]);
        let config = ConstraintConfig::default();
        let violations = validate(&field, &rows, &config).unwrap();
        assert!(violations.iter().any(|v| v.kind == ViolationKind::DeadEndTooLong));
    }

    #[test]
    fn closest_points_on_parallel_segments_lies_at_their_shared_span() {
        let a = Line::new(coord! {x: 0.0, y: 0.0}, coord! {x: 10.0, y: 0.0});
        let b = Line::new(coord! {x: 0.0, y: 2.0}, coord! {x: 10.0, y: 2.0});
        let (pa, pb) = closest_points_on_segments(a, b);
        assert!((pa.y - 0.0).abs() < 1e-9);
        assert!((pb.y - 2.0).abs() < 1e-9);
    }
}
