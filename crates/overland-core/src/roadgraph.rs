//! Road network graph and shortest-path routing.
//!
//! Used when a bundle carries placeholder grids and a non-empty road import:
//! the undirected graph has a node per unique road vertex and an edge per
//! consecutive vertex pair, weighted by planar distance in meters. Nodes are
//! interned on microdegree-quantized coordinates, components are labelled
//! exhaustively, and endpoints snap to the nearest node of the largest
//! component, so routing output is deterministic for a given network.

use crate::cancel::CancelToken;
use crate::error::SearchError;
use crate::models::{Coordinate, RoadNetwork};
use crate::route_engine::FloatOrd;
use crate::spatial::planar_distance;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Pop budget for one Dijkstra run. Hitting it is reported as
/// [`SearchError::BudgetExhausted`], never as "no path".
pub const DIJKSTRA_POP_BUDGET: usize = 100_000;

const INVALID: u32 = u32::MAX;

/// Undirected road graph with interned nodes.
pub struct RoadGraph {
    node_pos: Vec<Coordinate>,
    adjacency: Vec<Vec<(u32, f64)>>,
}

fn quantize(coord: Coordinate) -> (i64, i64) {
    (
        (coord.lat * 1e7).round() as i64,
        (coord.lon * 1e7).round() as i64,
    )
}

impl RoadGraph {
    /// Build the graph by walking each road's consecutive vertex pairs.
    /// Coordinates are expected in engine (lat, lon) order; the loader has
    /// already swapped imported geometry.
    pub fn from_network(roads: &RoadNetwork) -> Self {
        let mut index: HashMap<(i64, i64), u32> = HashMap::new();
        let mut node_pos: Vec<Coordinate> = Vec::new();
        let mut adjacency: Vec<Vec<(u32, f64)>> = Vec::new();

        let mut intern = |coord: Coordinate,
                          node_pos: &mut Vec<Coordinate>,
                          adjacency: &mut Vec<Vec<(u32, f64)>>|
         -> u32 {
            *index.entry(quantize(coord)).or_insert_with(|| {
                node_pos.push(coord);
                adjacency.push(Vec::new());
                (node_pos.len() - 1) as u32
            })
        };

        for coords in roads.values() {
            for pair in coords.windows(2) {
                let a = intern(pair[0], &mut node_pos, &mut adjacency);
                let b = intern(pair[1], &mut node_pos, &mut adjacency);
                if a == b {
                    continue;
                }
                let dist = planar_distance(pair[0], pair[1]);
                adjacency[a as usize].push((b, dist));
                adjacency[b as usize].push((a, dist));
            }
        }

        tracing::info!(
            nodes = node_pos.len(),
            roads = roads.len(),
            "road graph built"
        );

        Self { node_pos, adjacency }
    }

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    pub fn position(&self, node: u32) -> Coordinate {
        self.node_pos[node as usize]
    }

    /// Exhaustive BFS labelling; returns the node ids of the largest
    /// connected component. Ties keep the component discovered first, which
    /// is the one containing the lowest node id.
    pub fn largest_component(&self) -> Vec<u32> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut best: Vec<u32> = Vec::new();

        for seed in 0..n as u32 {
            if visited[seed as usize] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::from([seed]);
            visited[seed as usize] = true;
            while let Some(node) = queue.pop_front() {
                component.push(node);
                for &(neighbor, _) in &self.adjacency[node as usize] {
                    if !visited[neighbor as usize] {
                        visited[neighbor as usize] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            if component.len() > best.len() {
                best = component;
            }
        }

        best
    }

    /// Nearest node to `target` among `candidates`, by planar distance with
    /// node id as the deterministic tie-break.
    pub fn snap(&self, target: Coordinate, candidates: &[u32]) -> Option<u32> {
        candidates.iter().copied().min_by(|&a, &b| {
            let da = planar_distance(self.node_pos[a as usize], target);
            let db = planar_distance(self.node_pos[b as usize], target);
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        })
    }

    /// Dijkstra with the default pop budget.
    pub fn shortest_path(
        &self,
        from: u32,
        to: u32,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<u32>>, SearchError> {
        self.shortest_path_with_budget(from, to, DIJKSTRA_POP_BUDGET, cancel)
    }

    pub fn shortest_path_with_budget(
        &self,
        from: u32,
        to: u32,
        budget: usize,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<u32>>, SearchError> {
        if from == to {
            return Ok(Some(vec![from]));
        }

        let n = self.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev = vec![INVALID; n];
        dist[from as usize] = 0.0;

        // Min-heap; secondary key keeps tie-breaking deterministic.
        let mut heap: BinaryHeap<Reverse<(FloatOrd, u32)>> = BinaryHeap::new();
        heap.push(Reverse((FloatOrd(0.0), from)));

        let mut pops = 0usize;
        while let Some(Reverse((FloatOrd(cost), node))) = heap.pop() {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            pops += 1;
            if pops > budget {
                return Err(SearchError::BudgetExhausted { cap: budget, pops });
            }
            if pops % 5_000 == 0 {
                tracing::debug!(pops, queue = heap.len(), "dijkstra progress");
            }

            if node == to {
                let mut path = vec![node];
                let mut cursor = node;
                while prev[cursor as usize] != INVALID {
                    cursor = prev[cursor as usize];
                    path.push(cursor);
                }
                path.reverse();
                return Ok(Some(path));
            }

            // Skip stale heap entries.
            if cost > dist[node as usize] {
                continue;
            }

            for &(neighbor, weight) in &self.adjacency[node as usize] {
                let new_cost = cost + weight;
                if new_cost < dist[neighbor as usize] {
                    dist[neighbor as usize] = new_cost;
                    prev[neighbor as usize] = node;
                    heap.push(Reverse((FloatOrd(new_cost), neighbor)));
                }
            }
        }

        Ok(None)
    }
}

/// Shortest road route between two coordinates: snap both endpoints to the
/// largest connected component, then run Dijkstra. A shared snap node yields
/// the trivial single-node path.
pub fn road_network_route(
    start: Coordinate,
    goal: Coordinate,
    roads: &RoadNetwork,
    cancel: &CancelToken,
) -> Result<Option<Vec<Coordinate>>, SearchError> {
    let graph = RoadGraph::from_network(roads);
    if graph.is_empty() {
        return Ok(None);
    }

    let component = graph.largest_component();
    let Some(start_node) = graph.snap(start, &component) else {
        return Ok(None);
    };
    let Some(goal_node) = graph.snap(goal, &component) else {
        return Ok(None);
    };
    tracing::debug!(
        start_snap_m = planar_distance(graph.position(start_node), start),
        goal_snap_m = planar_distance(graph.position(goal_node), goal),
        component = component.len(),
        "snapped endpoints to road graph"
    );

    if start_node == goal_node {
        return Ok(Some(vec![graph.position(start_node)]));
    }

    let path = graph.shortest_path(start_node, goal_node, cancel)?;
    Ok(path.map(|nodes| nodes.into_iter().map(|id| graph.position(id)).collect()))
}
