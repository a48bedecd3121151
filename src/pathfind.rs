//! A* pathfinding over the walkability grid.

use crate::error::GeometricFailure;
use crate::rasterize::{Cell, Grid};
use geo_types::Coord;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// A found path from start to goal: the sequence of grid cells visited,
/// and its total length in metres.
#[derive(Debug, Clone)]
pub struct Path {
    pub cells: Vec<Cell>,
    pub length_m: f64,
}

#[derive(PartialEq)]
struct QueueEntry {
    f_score: f64,
    // A monotonic insertion counter breaks ties deterministically: two
    // entries with equal f_score pop in the order they were pushed,
    // rather than in whatever order a float-keyed heap happens to settle
    // on, which otherwise makes path choice nondeterministic between runs.
    sequence: u64,
    cell: Cell,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the lowest f_score first.
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn heuristic(grid: &Grid, a: Cell, b: Cell) -> f64 {
    grid.euclidean_step_cost(a, b)
}

/// Snap a world point onto the nearest open grid cell, spiraling outward
/// if the requested point itself lands on blocked ground. The search
/// gives up after `rows + cols` rings — enough to cross the entire grid
/// from any starting cell.
fn snap(grid: &Grid, world: Coord<f64>, which: &'static str) -> Result<Cell, GeometricFailure> {
    let cell = grid.to_grid(world);
    let radius = grid.rows + grid.cols;
    grid.nearest_open_cell(cell, radius).ok_or(GeometricFailure::CouldNotSnapToOpenCell { which, radius })
}

/// Find the shortest walkable path between two world points, snapping
/// each endpoint onto the nearest open cell first. Returns `Ok(None)` if
/// both endpoints snap successfully but no path connects them (the maze
/// is disconnected), and `Err` only if an endpoint has no open cell
/// within the search radius at all.
pub fn find_path(grid: &Grid, start: Coord<f64>, goal: Coord<f64>) -> Result<Option<Path>, GeometricFailure> {
    let start_cell = snap(grid, start, "start")?;
    let goal_cell = snap(grid, goal, "goal")?;

    if start_cell == goal_cell {
        return Ok(Some(Path { cells: vec![start_cell], length_m: 0.0 }));
    }

    let mut open_set = BinaryHeap::new();
    let mut sequence: u64 = 0;
    open_set.push(QueueEntry { f_score: heuristic(grid, start_cell, goal_cell), sequence, cell: start_cell });

    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, f64> = HashMap::new();
    g_score.insert(start_cell, 0.0);

    let mut visited: std::collections::HashSet<Cell> = std::collections::HashSet::new();

    while let Some(QueueEntry { cell: current, .. }) = open_set.pop() {
        if current == goal_cell {
            return Ok(Some(reconstruct_path(grid, &came_from, current)));
        }
        if !visited.insert(current) {
            continue;
        }
        let current_g = *g_score.get(&current).unwrap_or(&f64::INFINITY);

        for neighbor in grid.neighbors8(current) {
            if !grid.is_open(neighbor) {
                continue;
            }
            let tentative_g = current_g + grid.euclidean_step_cost(current, neighbor);
            let best_known = *g_score.get(&neighbor).unwrap_or(&f64::INFINITY);
            if tentative_g < best_known {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g);
                sequence += 1;
                open_set.push(QueueEntry {
                    f_score: tentative_g + heuristic(grid, neighbor, goal_cell),
                    sequence,
                    cell: neighbor,
                });
            }
        }
    }

    Ok(None)
}

fn reconstruct_path(grid: &Grid, came_from: &HashMap<Cell, Cell>, mut current: Cell) -> Path {
    let mut cells = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();
    let length_m = path_length(grid, &cells);
    Path { cells, length_m }
}

/// Sum the Euclidean step cost along a sequence of adjacent cells.
pub fn path_length(grid: &Grid, cells: &[Cell]) -> f64 {
    cells.windows(2).map(|pair| grid.euclidean_step_cost(pair[0], pair[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, MultiLineString, Polygon};

    fn corridor_grid() -> Grid {
        let corridor = Polygon::new(
            LineString::new(vec![
                coord! {x: 0.0, y: 2.0},
                coord! {x: 20.0, y: 2.0},
                coord! {x: 20.0, y: 3.0},
                coord! {x: 0.0, y: 3.0},
                coord! {x: 0.0, y: 2.0},
            ]),
            vec![],
        );
        Grid::rasterize(&corridor, &MultiLineString::new(vec![]), 1.0)
    }

    #[test]
    fn finds_a_path_down_a_straight_corridor() {
        let grid = corridor_grid();
        let path = find_path(&grid, coord! {x: 1.0, y: 2.5}, coord! {x: 18.0, y: 2.5}).unwrap();
        assert!(path.is_some());
        assert!(path.unwrap().length_m > 10.0);
    }

    #[test]
    fn disconnected_points_return_none_not_error() {
        let field = Polygon::new(
            LineString::new(vec![
                coord! {x: 0.0, y: 0.0},
                coord! {x: 20.0, y: 0.0},
                coord! {x: 20.0, y: 20.0},
                coord! {x: 0.0, y: 20.0},
                coord! {x: 0.0, y: 0.0},
            ]),
            vec![],
        );
        // A full-width wall at a row-center-aligned y cuts row 9 off
        // entirely, which severs every path between the two halves.
        let wall = MultiLineString::new(vec![LineString::new(vec![
            coord! {x: -5.0, y: 9.5},
            coord! {x: 25.0, y: 9.5},
        ])]);
        let grid = Grid::rasterize(&field, &wall, 1.0);
        let path = find_path(&grid, coord! {x: 2.0, y: 2.0}, coord! {x: 18.0, y: 18.0}).unwrap();
        assert!(path.is_none());
    }
}
