//! Terrain grid helpers: coordinate/cell conversion, slopes, and route step
//! assembly over the DEM + landcover pair.

use crate::models::{Coordinate, DemData, LandcoverData, RouteStep, StepKind};
use crate::spatial::{round_to, METERS_PER_DEG_LAT, METERS_PER_DEG_LON};

/// (row, col) cell index into the grids.
pub type GridIndex = (usize, usize);

/// Distance of cumulative travel between synthetic checkpoints.
pub const CHECKPOINT_INTERVAL_M: f64 = 250.0;

/// Convert a coordinate to its nearest (row, col) cell. The result may lie
/// outside the grid; callers check with [`in_bounds`].
pub fn coordinate_to_grid(coord: Coordinate, dem: &DemData) -> (i64, i64) {
    let origin = dem.metadata.origin;
    let cell = dem.metadata.cell_size_m;
    let northing = (coord.lat - origin.lat) * METERS_PER_DEG_LAT;
    let easting = (coord.lon - origin.lon) * METERS_PER_DEG_LON;
    let row = (northing / cell).round() as i64;
    let col = (easting / cell).round() as i64;
    (row, col)
}

/// Invert [`coordinate_to_grid`]; the result is rounded to six decimal
/// places, about 0.1 m of latitude.
pub fn grid_to_coordinate(row: usize, col: usize, dem: &DemData) -> Coordinate {
    let origin = dem.metadata.origin;
    let cell = dem.metadata.cell_size_m;
    let lat = origin.lat + (row as f64 * cell) / METERS_PER_DEG_LAT;
    let lon = origin.lon + (col as f64 * cell) / METERS_PER_DEG_LON;
    Coordinate::new(round_to(lat, 6), round_to(lon, 6))
}

pub fn in_bounds(row: i64, col: i64, dem: &DemData) -> bool {
    row >= 0 && (row as usize) < dem.height() && col >= 0 && (col as usize) < dem.width()
}

/// Slope in degrees between two cells: |Δelevation| over planar distance.
/// Identical cells return 0.
pub fn slope_between(dem: &DemData, from: GridIndex, to: GridIndex) -> f64 {
    let delta_h = dem.elevation(to.0, to.1) - dem.elevation(from.0, from.1);
    let dr = to.0 as f64 - from.0 as f64;
    let dc = to.1 as f64 - from.1 as f64;
    let dist_m = dem.metadata.cell_size_m * (dr * dr + dc * dc).sqrt();
    if dist_m == 0.0 {
        return 0.0;
    }
    (delta_h.abs() / dist_m).atan().to_degrees()
}

/// Maximum slope from a cell to any of its eight in-bounds neighbors.
pub fn local_slope(dem: &DemData, row: usize, col: usize) -> f64 {
    let mut worst = 0.0f64;
    for dr in -1i64..=1 {
        for dc in -1i64..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            let nr = row as i64 + dr;
            let nc = col as i64 + dc;
            if in_bounds(nr, nc, dem) {
                worst = worst.max(slope_between(dem, (row, col), (nr as usize, nc as usize)));
            }
        }
    }
    worst
}

/// Expand a cell path into annotated route steps, inserting checkpoint
/// entries on terrain change or every [`CHECKPOINT_INTERVAL_M`] of travel.
///
/// Each path cell yields exactly one segment step; checkpoints are extra
/// entries sharing the segment's position.
pub fn assemble_route_steps(
    path: &[GridIndex],
    dem: &DemData,
    landcover: &LandcoverData,
) -> Vec<RouteStep> {
    let mut steps = Vec::new();
    let Some(&(first_row, first_col)) = path.first() else {
        return steps;
    };

    let cell = dem.metadata.cell_size_m;
    let mut cumulative_m = 0.0;
    let mut last_checkpoint_m = 0.0;
    let mut prev = (first_row, first_col);
    let mut last_terrain = landcover.class_at(first_row, first_col).to_string();
    let mut checkpoint_counter = 0usize;

    for (offset, &(row, col)) in path.iter().enumerate() {
        let segment_id = offset + 1;
        if segment_id > 1 {
            let dr = row as f64 - prev.0 as f64;
            let dc = col as f64 - prev.1 as f64;
            cumulative_m += cell * (dr * dr + dc * dc).sqrt();
            prev = (row, col);
        }

        let terrain = landcover.class_at(row, col).to_string();
        let slope = round_to(local_slope(dem, row, col), 2);
        let km_marker = round_to(cumulative_m / 1000.0, 3);
        let base = RouteStep {
            segment_id,
            coordinate: grid_to_coordinate(row, col, dem),
            slope,
            terrain: terrain.clone(),
            cost: landcover.cost_factor(row, col),
            exposure: landcover.exposure(row, col),
            elevation: dem.elevation(row, col),
            kind: StepKind::Segment,
            km_marker,
            label: None,
        };
        steps.push(base.clone());

        let terrain_changed = terrain != last_terrain && segment_id > 1;
        let interval_reached =
            cumulative_m - last_checkpoint_m >= CHECKPOINT_INTERVAL_M && segment_id > 1;

        if terrain_changed || interval_reached {
            checkpoint_counter += 1;
            let reason = if terrain_changed {
                format!("Terrain {last_terrain}->{terrain}")
            } else {
                format!("Distance {} m", cumulative_m as i64)
            };
            steps.push(RouteStep {
                kind: StepKind::Checkpoint,
                label: Some(format!("CP{checkpoint_counter}: {reason}")),
                ..base
            });
            last_checkpoint_m = cumulative_m;
        }
        last_terrain = terrain;
    }

    steps
}

/// Total planar distance plus summed ascent and descent along a cell path.
pub fn route_distance_and_elevation(path: &[GridIndex], dem: &DemData) -> (f64, f64, f64) {
    if path.len() < 2 {
        return (0.0, 0.0, 0.0);
    }
    let cell = dem.metadata.cell_size_m;
    let mut dist = 0.0;
    let mut ascent = 0.0;
    let mut descent = 0.0;
    for pair in path.windows(2) {
        let (r1, c1) = pair[0];
        let (r2, c2) = pair[1];
        let dr = r2 as f64 - r1 as f64;
        let dc = c2 as f64 - c1 as f64;
        dist += cell * (dr * dr + dc * dc).sqrt();
        let delta = dem.elevation(r2, c2) - dem.elevation(r1, c1);
        if delta > 0.0 {
            ascent += delta;
        } else {
            descent -= delta;
        }
    }
    (dist, ascent, descent)
}
