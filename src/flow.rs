//! Visitor flow simulation: a seeded random walk biased toward a
//! per-visitor target exit, used to estimate bottlenecks and typical
//! completion time before a maze opens to the public.

use crate::pathfind::path_length;
use crate::rasterize::{Cell, Grid};
use geo_types::Coord;
use rand::Rng;
use rand_pcg::Pcg64;
use std::collections::{HashMap, HashSet};

/// One simulated visitor's outcome.
#[derive(Debug, Clone)]
pub struct WalkerResult {
    pub reached_exit: bool,
    pub steps_taken: usize,
    pub path_length_m: f64,
}

/// Aggregate results across every simulated visitor.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub walkers: Vec<WalkerResult>,
    /// Visit count per grid cell, for rendering a heatmap.
    pub heatmap: HashMap<Cell, u32>,
    /// Cells at or above the 90th-percentile visit count among visited
    /// cells, worst first, capped at 20.
    pub bottlenecks: Vec<(Coord<f64>, u32)>,
    pub completion_rate: f64,
    pub mean_steps_to_exit: f64,
}

const MAX_BOTTLENECKS: usize = 20;
const BOTTLENECK_PERCENTILE: f64 = 90.0;
/// Probability a step sorts its valid neighbors by ascending Manhattan
/// distance to the walker's target exit before the unvisited-preference
/// rule picks among them.
const EXIT_BIAS: f64 = 0.7;
/// Probability an unvisited-preferring step takes the closest unvisited
/// neighbor rather than a uniformly random unvisited one.
const PREFER_CLOSEST_UNVISITED: f64 = 0.8;

/// Simulate `walker_count` visitors. Each visitor starts at a random
/// entrance from `entrances` and is assigned a random fixed target exit
/// from `exits` for the whole walk; the walk is seeded deterministically
/// from `seed` so repeated runs with the same inputs produce identical
/// reports.
pub fn simulate_flow(
    grid: &Grid,
    entrances: &[Coord<f64>],
    exits: &[Coord<f64>],
    walker_count: usize,
    max_steps: usize,
    seed: u64,
) -> FlowReport {
    let mut rng = Pcg64::new(seed as u128, 0xa02b_dbf7_bb3c_0a7a_u128);
    let entrance_cells: Vec<Cell> = entrances.iter().map(|&e| grid.to_grid(e)).collect();
    let exit_cells: Vec<Cell> = exits.iter().map(|&e| grid.to_grid(e)).collect();

    let mut heatmap: HashMap<Cell, u32> = HashMap::new();
    let mut walkers = Vec::with_capacity(walker_count);

    if entrance_cells.is_empty() || exit_cells.is_empty() {
        return FlowReport { walkers, heatmap, bottlenecks: Vec::new(), completion_rate: 0.0, mean_steps_to_exit: 0.0 };
    }

    for _ in 0..walker_count {
        let start = entrance_cells[rng.gen_range(0..entrance_cells.len())];
        let target = exit_cells[rng.gen_range(0..exit_cells.len())];
        let result = walk_one(grid, start, target, &exit_cells, max_steps, &mut rng, &mut heatmap);
        walkers.push(result);
    }

    let completion_rate = if walkers.is_empty() {
        0.0
    } else {
        walkers.iter().filter(|w| w.reached_exit).count() as f64 / walkers.len() as f64
    };
    let completed_steps: Vec<f64> = walkers.iter().filter(|w| w.reached_exit).map(|w| w.steps_taken as f64).collect();
    let mean_steps_to_exit = if completed_steps.is_empty() { 0.0 } else { completed_steps.iter().sum::<f64>() / completed_steps.len() as f64 };

    let bottlenecks = bottlenecks(grid, &heatmap);

    FlowReport { walkers, heatmap, bottlenecks, completion_rate, mean_steps_to_exit }
}

/// Top visited cells at or above the 90th percentile of nonzero visit
/// counts, worst first, capped at 20.
fn bottlenecks(grid: &Grid, heatmap: &HashMap<Cell, u32>) -> Vec<(Coord<f64>, u32)> {
    if heatmap.is_empty() {
        return Vec::new();
    }
    let mut counts: Vec<u32> = heatmap.values().copied().collect();
    counts.sort_unstable();
    let threshold = percentile(&counts, BOTTLENECK_PERCENTILE);

    let mut bottlenecks: Vec<(Coord<f64>, u32)> =
        heatmap.iter().filter(|&(_, &count)| count as f64 >= threshold).map(|(&cell, &count)| (grid.to_world(cell), count)).collect();
    bottlenecks.sort_by(|a, b| b.1.cmp(&a.1));
    bottlenecks.truncate(MAX_BOTTLENECKS);
    bottlenecks
}

/// Linear-interpolation percentile over an already-sorted slice, matching
/// `numpy.percentile`'s default behavior.
fn percentile(sorted: &[u32], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo] as f64;
    }
    let frac = rank - lo as f64;
    sorted[lo] as f64 + frac * (sorted[hi] as f64 - sorted[lo] as f64)
}

fn walk_one(
    grid: &Grid,
    start: Cell,
    target: Cell,
    exit_cells: &[Cell],
    max_steps: usize,
    rng: &mut Pcg64,
    heatmap: &mut HashMap<Cell, u32>,
) -> WalkerResult {
    let mut current = start;
    let mut path = vec![current];
    let mut visited: HashSet<Cell> = HashSet::new();

    for step in 0..max_steps {
        *heatmap.entry(current).or_insert(0) += 1;
        visited.insert(current);

        if current == target || exit_cells.contains(&current) {
            return WalkerResult { reached_exit: true, steps_taken: step + 1, path_length_m: path_length(grid, &path) };
        }

        let mut valid: Vec<Cell> = grid.neighbors4(current).into_iter().filter(|c| grid.is_open(*c)).collect();
        if valid.is_empty() {
            break;
        }

        if rng.gen::<f64>() < EXIT_BIAS && valid.len() > 1 {
            valid.sort_by_key(|c| manhattan(*c, target));
        }

        let unvisited: Vec<Cell> = valid.iter().copied().filter(|c| !visited.contains(c)).collect();
        let next = if !unvisited.is_empty() {
            if rng.gen::<f64>() < PREFER_CLOSEST_UNVISITED {
                unvisited[0]
            } else {
                unvisited[rng.gen_range(0..unvisited.len())]
            }
        } else {
            valid[rng.gen_range(0..valid.len())]
        };

        current = next;
        path.push(current);
    }

    WalkerResult { reached_exit: exit_cells.contains(&current), steps_taken: max_steps, path_length_m: path_length(grid, &path) }
}

fn manhattan(a: Cell, b: Cell) -> i64 {
    (a.col as i64 - b.col as i64).abs() + (a.row as i64 - b.row as i64).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, MultiLineString, Polygon};

    fn open_square_grid(side: f64, resolution: f64) -> Grid {
        let h = side / 2.0;
        let square = Polygon::new(
            LineString::new(vec![
                coord! {x: -h, y: -h},
                coord! {x: h, y: -h},
                coord! {x: h, y: h},
                coord! {x: -h, y: h},
                coord! {x: -h, y: -h},
            ]),
            vec![],
        );
        Grid::rasterize(&square, &MultiLineString::new(vec![]), resolution)
    }

    #[test]
    fn same_seed_gives_identical_reports() {
        let grid = open_square_grid(30.0, 1.0);
        let entrances = vec![coord! {x: -14.0, y: -14.0}];
        let exits = vec![coord! {x: 14.0, y: 14.0}];
        let a = simulate_flow(&grid, &entrances, &exits, 20, 500, 42);
        let b = simulate_flow(&grid, &entrances, &exits, 20, 500, 42);
        assert_eq!(a.completion_rate, b.completion_rate);
        assert_eq!(a.mean_steps_to_exit, b.mean_steps_to_exit);
    }

    #[test]
    fn exit_biased_walkers_mostly_reach_the_exit_in_an_open_room() {
        let grid = open_square_grid(20.0, 1.0);
        let entrances = vec![coord! {x: -9.0, y: -9.0}];
        let exits = vec![coord! {x: 9.0, y: 9.0}];
        let report = simulate_flow(&grid, &entrances, &exits, 30, 2000, 7);
        assert!(report.completion_rate > 0.5);
    }

    #[test]
    fn no_entrances_or_exits_yields_empty_report() {
        let grid = open_square_grid(10.0, 1.0);
        let report = simulate_flow(&grid, &[], &[coord! {x: 4.0, y: 4.0}], 10, 100, 1);
        assert!(report.walkers.is_empty());
        assert_eq!(report.completion_rate, 0.0);
    }

    #[test]
    fn bottlenecks_are_filtered_by_90th_percentile() {
        let grid = open_square_grid(40.0, 1.0);
        let entrances = vec![coord! {x: -19.0, y: -19.0}];
        let exits = vec![coord! {x: 19.0, y: 19.0}];
        let report = simulate_flow(&grid, &entrances, &exits, 50, 4000, 11);
        if let Some(&max_count) = report.heatmap.values().max() {
            for &(_, count) in &report.bottlenecks {
                assert!(count <= max_count);
            }
        }
        assert!(report.bottlenecks.len() <= 20);
    }
}
