//! Emergency-exit coverage: for every open cell, find the distance to
//! the nearest emergency exit, summarize how much of the maze is
//! covered, and suggest where to add an exit to fix the worst gap.

use crate::rasterize::{Cell, Grid};
use geo::{Closest, ClosestPoint};
use geo_types::{Coord, Point, Polygon};

/// Coverage summary for a set of emergency exits against a walkability
/// grid.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    /// Fraction of open cells within `max_distance_m` of some exit.
    pub covered_fraction: f64,
    /// The open cells farthest from any exit, worst first, capped at 20.
    pub worst_points: Vec<(Coord<f64>, f64)>,
    /// For each exit (in input order), the area in m² of the open cells
    /// for which it is the nearest exit within `max_distance_m`.
    pub per_exit_coverage_m2: Vec<(Coord<f64>, f64)>,
}

const MAX_WORST_POINTS: usize = 20;

/// Evaluate how well `exits` cover the maze: every open cell farther than
/// `max_distance_m` from its nearest exit counts against the covered
/// fraction, and the worst-served cells are reported so a host can show
/// them on a map.
pub fn evaluate_coverage(grid: &Grid, exits: &[Coord<f64>], max_distance_m: f64) -> CoverageReport {
    let exit_cells: Vec<Cell> = exits.iter().map(|&e| grid.to_grid(e)).filter(|c| grid.in_bounds(*c)).collect();
    let cell_area_m2 = grid.resolution_m * grid.resolution_m;

    let mut open_count = 0usize;
    let mut covered_count = 0usize;
    let mut worst: Vec<(Coord<f64>, f64)> = Vec::new();
    let mut per_exit_cells = vec![0usize; exits.len()];

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let cell = Cell { col, row };
            if !grid.is_open(cell) {
                continue;
            }
            open_count += 1;
            let mut nearest = f64::INFINITY;
            let mut nearest_idx: Option<usize> = None;
            for (idx, &e) in exit_cells.iter().enumerate() {
                let d = grid.euclidean_step_cost(cell, e);
                if d < nearest {
                    nearest = d;
                    nearest_idx = Some(idx);
                }
            }
            if nearest <= max_distance_m {
                covered_count += 1;
                if let Some(idx) = nearest_idx {
                    per_exit_cells[idx] += 1;
                }
            } else {
                worst.push((grid.to_world(cell), nearest));
            }
        }
    }

    worst.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    worst.truncate(MAX_WORST_POINTS);

    let per_exit_coverage_m2 =
        exits.iter().zip(per_exit_cells.iter()).map(|(&e, &count)| (e, count as f64 * cell_area_m2)).collect();

    let covered_fraction = if open_count == 0 { 1.0 } else { covered_count as f64 / open_count as f64 };
    CoverageReport { covered_fraction, worst_points: worst, per_exit_coverage_m2 }
}

/// Greedily suggest a boundary point for a new emergency exit: among
/// every open cell, find the one farthest from every existing exit, then
/// project it onto the nearest point on the field's exterior ring — an
/// exit can only be cut through where the field meets the outside world.
pub fn suggest_boundary_placement(grid: &Grid, field: &Polygon<f64>, exits: &[Coord<f64>]) -> Option<Coord<f64>> {
    let exit_cells: Vec<Cell> = exits.iter().map(|&e| grid.to_grid(e)).filter(|c| grid.in_bounds(*c)).collect();

    let mut best: Option<(Cell, f64)> = None;
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let cell = Cell { col, row };
            if !grid.is_open(cell) {
                continue;
            }
            let nearest = if exit_cells.is_empty() {
                f64::INFINITY
            } else {
                exit_cells.iter().map(|&e| grid.euclidean_step_cost(cell, e)).fold(f64::INFINITY, f64::min)
            };
            if best.map(|(_, d)| nearest > d).unwrap_or(true) {
                best = Some((cell, nearest));
            }
        }
    }
    let (cell, _) = best?;
    let world = grid.to_world(cell);
    match field.exterior().closest_point(&Point::from(world)) {
        Closest::SinglePoint(p) | Closest::Intersection(p) => Some(p.into()),
        Closest::Indeterminate => Some(world),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::EuclideanDistance;
    use geo_types::{coord, LineString, MultiLineString};

    fn square_field(side: f64) -> Polygon<f64> {
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

    fn open_square_grid(side: f64, resolution: f64) -> (Grid, Polygon<f64>) {
        let square = square_field(side);
        let grid = Grid::rasterize(&square, &MultiLineString::new(vec![]), resolution);
        (grid, square)
    }

    #[test]
    fn single_central_exit_leaves_far_corners_uncovered() {
        let (grid, _) = open_square_grid(100.0, 2.0);
        let report = evaluate_coverage(&grid, &[coord! {x: 0.0, y: 0.0}], 20.0);
        assert!(report.covered_fraction < 1.0);
        assert!(!report.worst_points.is_empty());
        assert_eq!(report.per_exit_coverage_m2.len(), 1);
        assert!(report.per_exit_coverage_m2[0].1 > 0.0);
    }

    #[test]
    fn exits_at_every_corner_cover_everything_within_radius() {
        let (grid, _) = open_square_grid(20.0, 2.0);
        let exits = vec![
            coord! {x: -9.0, y: -9.0},
            coord! {x: 9.0, y: -9.0},
            coord! {x: -9.0, y: 9.0},
            coord! {x: 9.0, y: 9.0},
        ];
        let report = evaluate_coverage(&grid, &exits, 15.0);
        assert!(report.covered_fraction > 0.9);
        assert_eq!(report.per_exit_coverage_m2.len(), 4);
        let total_m2: f64 = report.per_exit_coverage_m2.iter().map(|&(_, a)| a).sum();
        assert!(total_m2 > 0.0);
    }

    #[test]
    fn suggestion_prefers_the_point_farthest_from_existing_exits() {
        let (grid, field) = open_square_grid(40.0, 2.0);
        let suggestion = suggest_boundary_placement(&grid, &field, &[coord! {x: -19.0, y: -19.0}]);
        assert!(suggestion.is_some());
        let point = suggestion.unwrap();
        assert!(point.x > 0.0 || point.y > 0.0);
    }

    #[test]
    fn suggestion_lands_on_the_field_exterior_ring() {
        let (grid, field) = open_square_grid(40.0, 2.0);
        let suggestion = suggest_boundary_placement(&grid, &field, &[]).unwrap();
        let distance_to_ring = Point::from(suggestion).euclidean_distance(field.exterior());
        assert_abs_diff_eq!(distance_to_ring, 0.0, epsilon = 0.01);
    }
}
