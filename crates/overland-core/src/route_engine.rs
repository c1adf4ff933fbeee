//! Weighted A* over the elevation + landcover grid.
//!
//! Eight-connected search parameterized by a cost profile. The heuristic is
//! straight-line cell distance scaled by cell size; sub-unit terrain/road
//! multipliers can make it optimistic in the wrong direction, trading strict
//! optimality for plausible routing. Callers that need a provably shortest
//! path set `strict_heuristic`, which clamps those multipliers to 1.0.

use crate::cancel::CancelToken;
use crate::error::SearchError;
use crate::models::{Coordinate, DemData, LandcoverData, Obstacle, RoadNetwork};
use crate::profiles::CostProfile;
use crate::spatial::{planar_distance, METERS_PER_DEG_LAT, METERS_PER_DEG_LON};
use crate::terrain::{coordinate_to_grid, grid_to_coordinate, in_bounds, slope_between, GridIndex};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Cost-model knobs for one search, usually derived from a [`CostProfile`].
#[derive(Debug, Clone)]
pub struct GridSearchParams<'a> {
    pub slope_weight: f64,
    pub terrain_multipliers: &'a [(&'a str, f64)],
    pub exposure_penalty: f64,
    pub road_bias: f64,
    /// Clamp sub-unit multipliers to 1.0 so the heuristic stays admissible.
    pub strict_heuristic: bool,
}

impl<'a> GridSearchParams<'a> {
    pub fn from_profile(profile: &'a CostProfile) -> Self {
        Self {
            slope_weight: profile.slope_weight,
            terrain_multipliers: profile.terrain_multipliers,
            exposure_penalty: profile.exposure_penalty,
            road_bias: profile.road_bias,
            strict_heuristic: false,
        }
    }

    fn multiplier_for(&self, class: &str) -> f64 {
        self.terrain_multipliers
            .iter()
            .find(|(name, _)| *name == class)
            .map(|(_, factor)| *factor)
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatOrd(pub(crate) f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenCell {
    row: usize,
    col: usize,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl OpenCell {
    fn key(&self) -> GridIndex {
        (self.row, self.col)
    }
}

impl PartialOrd for OpenCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenCell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.row.cmp(&other.row))
            .then_with(|| self.col.cmp(&other.col))
    }
}

const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Road proximity discount: cells near an imported road are cheaper to move
/// through. Thresholds in meters to the nearest road vertex.
fn road_influence(roads: &RoadNetwork, coord: Coordinate) -> f64 {
    if roads.is_empty() {
        return 1.0;
    }
    let mut best = f64::INFINITY;
    for road in roads.values() {
        for &vertex in road {
            best = best.min(planar_distance(coord, vertex));
        }
    }
    if best < 100.0 {
        0.7
    } else if best < 300.0 {
        0.85
    } else if best < 500.0 {
        0.95
    } else {
        1.0
    }
}

/// Centroid of a cell, used for obstacle containment checks.
fn cell_centroid(row: usize, col: usize, dem: &DemData) -> Coordinate {
    let origin = dem.metadata.origin;
    let cell = dem.metadata.cell_size_m;
    Coordinate::new(
        origin.lat + ((row as f64 + 0.5) * cell) / METERS_PER_DEG_LAT,
        origin.lon + ((col as f64 + 0.5) * cell) / METERS_PER_DEG_LON,
    )
}

fn cell_blocked(row: usize, col: usize, dem: &DemData, obstacles: &[Obstacle]) -> bool {
    if obstacles.is_empty() {
        return false;
    }
    let centroid = cell_centroid(row, col, dem);
    obstacles.iter().any(|obstacle| obstacle.contains(centroid))
}

fn heuristic(a: GridIndex, b: GridIndex, cell_size: f64) -> f64 {
    let dr = a.0 as f64 - b.0 as f64;
    let dc = a.1 as f64 - b.1 as f64;
    cell_size * (dr * dr + dc * dc).sqrt()
}

/// Run the weighted A* between two coordinates.
///
/// Returns `Ok(None)` when either endpoint falls outside the grid or no path
/// exists; the caller skips the profile rather than failing the request.
#[allow(clippy::too_many_arguments)]
pub fn a_star_route(
    start: Coordinate,
    goal: Coordinate,
    dem: &DemData,
    landcover: &LandcoverData,
    obstacles: &[Obstacle],
    roads: &RoadNetwork,
    params: &GridSearchParams<'_>,
    cancel: &CancelToken,
) -> Result<Option<Vec<GridIndex>>, SearchError> {
    let (start_row, start_col) = coordinate_to_grid(start, dem);
    let (goal_row, goal_col) = coordinate_to_grid(goal, dem);
    if !in_bounds(start_row, start_col, dem) || !in_bounds(goal_row, goal_col, dem) {
        return Ok(None);
    }
    let start_idx: GridIndex = (start_row as usize, start_col as usize);
    let goal_idx: GridIndex = (goal_row as usize, goal_col as usize);
    let cell_size = dem.metadata.cell_size_m;

    let mut open_set: BinaryHeap<Reverse<OpenCell>> = BinaryHeap::new();
    open_set.push(Reverse(OpenCell {
        row: start_idx.0,
        col: start_idx.1,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(heuristic(start_idx, goal_idx, cell_size)),
    }));

    let mut came_from: HashMap<GridIndex, GridIndex> = HashMap::new();
    let mut g_score: HashMap<GridIndex, f64> = HashMap::new();
    g_score.insert(start_idx, 0.0);

    let mut pops = 0usize;
    while let Some(Reverse(current)) = open_set.pop() {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        pops += 1;
        if pops % 10_000 == 0 {
            tracing::debug!(pops, open = open_set.len(), "grid A* progress");
        }

        let current_key = current.key();
        if current_key == goal_idx {
            let mut path = vec![current_key];
            let mut cursor = current_key;
            while let Some(&prev) = came_from.get(&cursor) {
                cursor = prev;
                path.push(cursor);
            }
            path.reverse();
            return Ok(Some(path));
        }

        // Skip stale heap entries.
        let best_g = g_score.get(&current_key).copied().unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g + 1e-9 {
            continue;
        }

        for (dr, dc) in NEIGHBORS {
            let nr = current_key.0 as i64 + dr;
            let nc = current_key.1 as i64 + dc;
            if !in_bounds(nr, nc, dem) {
                continue;
            }
            let neighbor: GridIndex = (nr as usize, nc as usize);
            if cell_blocked(neighbor.0, neighbor.1, dem, obstacles) {
                continue;
            }

            let terrain_name = landcover.class_at(neighbor.0, neighbor.1);
            let mut class_multiplier = params.multiplier_for(terrain_name);
            let mut terrain_factor = landcover.cost_factor(neighbor.0, neighbor.1);
            if params.strict_heuristic {
                class_multiplier = class_multiplier.max(1.0);
                terrain_factor = terrain_factor.max(1.0);
            }
            terrain_factor *= class_multiplier;

            let slope = slope_between(dem, current_key, neighbor);
            let slope_factor = 1.0 + (slope / 30.0) * params.slope_weight;

            let coord = grid_to_coordinate(neighbor.0, neighbor.1, dem);
            let mut road_factor = road_influence(roads, coord);
            if params.road_bias != 1.0 {
                road_factor = road_factor.powf(params.road_bias);
            }
            if params.strict_heuristic {
                road_factor = road_factor.max(1.0);
            }

            let exposure_factor =
                1.0 + params.exposure_penalty * landcover.exposure(neighbor.0, neighbor.1);

            let move_cost = cell_size * ((dr * dr + dc * dc) as f64).sqrt();
            let tentative_g = best_g
                + move_cost * terrain_factor * slope_factor * road_factor * exposure_factor;

            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbor, current_key);
                g_score.insert(neighbor, tentative_g);
                open_set.push(Reverse(OpenCell {
                    row: neighbor.0,
                    col: neighbor.1,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + heuristic(neighbor, goal_idx, cell_size)),
                }));
            }
        }
    }

    Ok(None)
}
