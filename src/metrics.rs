//! Maze topology metrics: reduce the standing-row network to a graph of
//! junctions and dead ends, and derive a difficulty score from its
//! shape.
//!
//! The graph is an arena of nodes plus a coordinate hash map, not a
//! pointer graph — `rows::RowSet`'s segments already carry the geometry,
//! so all the graph needs is which endpoints coincide.

use crate::rows::RowSet;
use geo_types::Coord;
use std::collections::HashMap;

/// Coordinates are snapped to a grid of this spacing before being treated
/// as "the same point", so that floating-point noise from clipping
/// doesn't split one junction into several.
pub const SNAP_TOLERANCE_M: f64 = 0.5;

fn snap_key(c: Coord<f64>, tolerance_m: f64) -> (i64, i64) {
    ((c.x / tolerance_m).round() as i64, (c.y / tolerance_m).round() as i64)
}

/// A node in the row-network graph: a point where one or more row
/// segments meet.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Coord<f64>,
    pub degree: usize,
}

/// The row network reduced to nodes (segment endpoints, snapped together)
/// and edges (one per segment, referencing its endpoint nodes by index).
#[derive(Debug, Clone, Default)]
pub struct RowGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<(usize, usize, f64)>,
}

impl RowGraph {
    pub fn dead_end_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.degree == 1).count()
    }

    pub fn junction_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.degree >= 3).count()
    }

    pub fn total_edge_length(&self) -> f64 {
        self.edges.iter().map(|(_, _, len)| len).sum()
    }

    /// Adjacency list keyed by node index: for each neighbor, the edge
    /// index in `self.edges` so a walker can recover its length.
    pub fn adjacency(&self) -> Vec<Vec<(usize, usize)>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for (edge_idx, &(a, b, _)) in self.edges.iter().enumerate() {
            adj[a].push((b, edge_idx));
            adj[b].push((a, edge_idx));
        }
        adj
    }
}

/// Build the snapped-coordinate graph for a row set at the default
/// metrics-engine tolerance.
pub fn build_graph(rows: &RowSet) -> RowGraph {
    build_graph_with_tolerance(rows, SNAP_TOLERANCE_M)
}

/// Build the snapped-coordinate graph for a row set: every row segment's
/// two endpoints become nodes (or reuse an existing node within
/// `tolerance_m`), and each segment becomes one edge. Exposed with an
/// explicit tolerance so other checks (e.g. the dead-end-length
/// constraint) can reuse the same graph shape at their own snap distance.
pub fn build_graph_with_tolerance(rows: &RowSet, tolerance_m: f64) -> RowGraph {
    use geo::EuclideanLength;

    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut nodes: Vec<Node> = Vec::new();
    let mut edges = Vec::new();

    let mut node_for = |point: Coord<f64>, nodes: &mut Vec<Node>, index: &mut HashMap<(i64, i64), usize>| -> usize {
        let key = snap_key(point, tolerance_m);
        *index.entry(key).or_insert_with(|| {
            nodes.push(Node { position: point, degree: 0 });
            nodes.len() - 1
        })
    };

    for line in &rows.0 .0 {
        if line.0.len() < 2 {
            continue;
        }
        let start = *line.0.first().unwrap();
        let end = *line.0.last().unwrap();
        let a = node_for(start, &mut nodes, &mut index);
        let b = node_for(end, &mut nodes, &mut index);
        nodes[a].degree += 1;
        nodes[b].degree += 1;
        edges.push((a, b, line.euclidean_length()));
    }

    RowGraph { nodes, edges }
}

/// A composite difficulty score in `[0, 1]`, rounded to three decimals:
/// weighted blend of dead-end density, junction density, and wall
/// length relative to the field's perimeter.
pub fn difficulty_score(graph: &RowGraph, field_area_m2: f64, field_perimeter_m: f64) -> f64 {
    if field_area_m2 <= 0.0 {
        return 0.0;
    }
    let sqrt_a = field_area_m2.sqrt();
    let dead_ends = graph.dead_end_count() as f64;
    let junctions = graph.junction_count() as f64;

    let dead_end_score = (5.0 * dead_ends / sqrt_a).min(1.0);
    let junction_score = (3.0 * junctions / sqrt_a).min(1.0);
    let wall_density = if field_perimeter_m > 0.0 {
        (graph.total_edge_length() / (5.0 * field_perimeter_m)).min(1.0)
    } else {
        0.0
    };

    let score = 0.35 * dead_end_score + 0.35 * junction_score + 0.30 * wall_density;
    (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, LineString, MultiLineString};

    fn rows_from(lines: Vec<Vec<Coord<f64>>>) -> RowSet {
        RowSet(MultiLineString::new(lines.into_iter().map(LineString::new).collect()))
    }

    #[test]
    fn disjoint_segments_produce_four_dead_ends() {
        let rows = rows_from(vec![
            vec![coord! {x: 0.0, y: 0.0}, coord! {x: 10.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 5.0}, coord! {x: 5.0, y: 15.0}],
        ]);
        let graph = build_graph(&rows);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.dead_end_count(), 4);
        assert_eq!(graph.junction_count(), 0);
    }

    #[test]
    fn shared_endpoint_becomes_one_node_of_higher_degree() {
        let rows = rows_from(vec![
            vec![coord! {x: 0.0, y: 0.0}, coord! {x: 5.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 0.0}, coord! {x: 10.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 0.0}, coord! {x: 5.0, y: 10.0}],
        ]);
        let graph = build_graph(&rows);
        assert_eq!(graph.junction_count(), 1);
        assert_eq!(graph.dead_end_count(), 3);
    }

    #[test]
    fn adjacency_lists_every_incident_edge_once_per_endpoint() {
        let rows = rows_from(vec![
            vec![coord! {x: 0.0, y: 0.0}, coord! {x: 5.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 0.0}, coord! {x: 10.0, y: 0.0}],
        ]);
        let graph = build_graph(&rows);
        let adj = graph.adjacency();
        let junction = graph.nodes.iter().position(|n| n.degree == 2).unwrap();
        assert_eq!(adj[junction].len(), 2);
    }

    #[test]
    fn difficulty_is_zero_for_empty_graph() {
        let rows = RowSet::default();
        let graph = build_graph(&rows);
        assert_eq!(difficulty_score(&graph, 1000.0, 400.0), 0.0);
    }

    #[test]
    fn difficulty_score_stays_within_unit_range() {
        let rows = rows_from(vec![
            vec![coord! {x: 0.0, y: 0.0}, coord! {x: 5.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 0.0}, coord! {x: 10.0, y: 0.0}],
            vec![coord! {x: 5.0, y: 0.0}, coord! {x: 5.0, y: 10.0}],
            vec![coord! {x: 5.0, y: 10.0}, coord! {x: 0.0, y: 15.0}],
        ]);
        let graph = build_graph(&rows);
        let score = difficulty_score(&graph, 2500.0, 200.0);
        assert!((0.0..=1.0).contains(&score));
    }
}
