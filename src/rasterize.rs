//! Walkability rasterization: turn a field polygon plus standing corn
//! walls into a regular grid of open/blocked cells that the pathfinder,
//! metrics engine, coverage checker, and flow simulator all share.

use crate::geometry::buffer::internal_buffer;
use geo::{BoundingRect, Contains, EuclideanDistance};
use geo_types::{coord, Coord, MultiLineString, MultiPolygon, Point, Polygon};

/// A regular square grid over a field's bounding box, with each cell
/// marked open (walkable) or blocked (standing corn, or outside the
/// field entirely).
#[derive(Debug, Clone)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub resolution_m: f64,
    origin: Coord<f64>,
    open: Vec<bool>,
}

/// A cell coordinate within a [`Grid`]: `col` is the X index, `row` is
/// the Y index, both zero-based from the grid's origin corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
}

impl Grid {
    /// Build a grid over `field`'s bounding box at `resolution_m` metres
    /// per cell. A cell is open iff its center falls inside `field` and
    /// outside `walls` buffered by `0.4 * resolution_m` — the buffer
    /// gives standing corn a little more than a half-cell of
    /// clearance so a single row of corn reliably blocks a one-cell-wide
    /// gap instead of leaving it porous to diagonal movement.
    pub fn rasterize(field: &Polygon<f64>, walls: &MultiLineString<f64>, resolution_m: f64) -> Grid {
        let bounds = field
            .bounding_rect()
            .unwrap_or_else(|| geo_types::Rect::new(coord! {x: 0.0, y: 0.0}, coord! {x: 0.0, y: 0.0}));
        let width = bounds.max().x - bounds.min().x;
        let height = bounds.max().y - bounds.min().y;
        let cols = (width / resolution_m).ceil().max(1.0) as usize;
        let rows = (height / resolution_m).ceil().max(1.0) as usize;
        let origin = bounds.min();

        let wall_buffer: MultiPolygon<f64> = internal_buffer(walls, 0.4 * resolution_m);

        let mut open = vec![false; cols * rows];
        for row in 0..rows {
            for col in 0..cols {
                let center = Point::from(Self::cell_center_at(origin, resolution_m, col, row));
                let inside_field = field.contains(&center);
                let inside_wall = wall_buffer.0.iter().any(|p| p.contains(&center));
                if inside_field && !inside_wall {
                    open[row * cols + col] = true;
                }
            }
        }

        Grid { cols, rows, resolution_m, origin, open }
    }

    fn cell_center_at(origin: Coord<f64>, resolution_m: f64, col: usize, row: usize) -> Coord<f64> {
        coord! {
            x: origin.x + (col as f64 + 0.5) * resolution_m,
            y: origin.y + (row as f64 + 0.5) * resolution_m,
        }
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.col < self.cols && cell.row < self.rows
    }

    pub fn is_open(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && self.open[cell.row * self.cols + cell.col]
    }

    /// Map a world coordinate to the grid cell containing it. Not bounds
    /// checked — the caller should confirm with [`Grid::in_bounds`].
    pub fn to_grid(&self, world: Coord<f64>) -> Cell {
        let col = ((world.x - self.origin.x) / self.resolution_m).floor();
        let row = ((world.y - self.origin.y) / self.resolution_m).floor();
        Cell { col: col.max(0.0) as usize, row: row.max(0.0) as usize }
    }

    /// Map a grid cell back to the world coordinate of its center.
    pub fn to_world(&self, cell: Cell) -> Coord<f64> {
        Self::cell_center_at(self.origin, self.resolution_m, cell.col, cell.row)
    }

    /// The four orthogonal neighbors (up, down, left, right), in that
    /// order, within grid bounds. Used by the flow simulator, which
    /// models visitor movement as 4-connected rather than diagonal.
    pub fn neighbors4(&self, cell: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(4);
        for (dcol, drow) in [(0i64, -1i64), (0, 1), (-1, 0), (1, 0)] {
            let ncol = cell.col as i64 + dcol;
            let nrow = cell.row as i64 + drow;
            if ncol < 0 || nrow < 0 {
                continue;
            }
            let candidate = Cell { col: ncol as usize, row: nrow as usize };
            if self.in_bounds(candidate) {
                out.push(candidate);
            }
        }
        out
    }

    pub fn neighbors8(&self, cell: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let ncol = cell.col as i64 + dx;
                let nrow = cell.row as i64 + dy;
                if ncol < 0 || nrow < 0 {
                    continue;
                }
                let candidate = Cell { col: ncol as usize, row: nrow as usize };
                if self.in_bounds(candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Spiral outward from `cell` and return the nearest open cell,
    /// searching up to `max_radius` rings. Used to snap a requested
    /// entrance/exit/emergency-exit point onto walkable ground when it
    /// lands a little inside a wall.
    pub fn nearest_open_cell(&self, cell: Cell, max_radius: usize) -> Option<Cell> {
        if self.is_open(cell) {
            return Some(cell);
        }
        for radius in 1..=max_radius {
            let r = radius as i64;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue; // only the ring at exactly this radius
                    }
                    let ncol = cell.col as i64 + dx;
                    let nrow = cell.row as i64 + dy;
                    if ncol < 0 || nrow < 0 {
                        continue;
                    }
                    let candidate = Cell { col: ncol as usize, row: nrow as usize };
                    if self.is_open(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    pub fn euclidean_step_cost(&self, a: Cell, b: Cell) -> f64 {
        let dx = a.col as f64 - b.col as f64;
        let dy = a.row as f64 - b.row as f64;
        (dx * dx + dy * dy).sqrt() * self.resolution_m
    }
}

/// Distance in metres from a world point to the nearest point of a
/// geometry, used by the coverage and metrics engines for "how far is
/// this cell from an exit" style queries without going through the grid.
pub fn world_distance(a: Coord<f64>, b: &MultiPolygon<f64>) -> f64 {
    Point::from(a).euclidean_distance(b)
}
