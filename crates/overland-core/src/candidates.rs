//! Candidate route generation.
//!
//! Dispatches to the grid A* or the road-graph Dijkstra depending on the
//! bundle's capability set, then composes per-candidate metrics: coverage by
//! class, hydrology crossings, mobility summary, and the dimensionless
//! estimated cost. Candidates leave here without ids; the engine numbers
//! them from its monotonic counter.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::cancel::CancelToken;
use crate::error::SearchError;
use crate::models::{
    Coordinate, HydrologyCheck, MobilitySummary, ProfileConstraints, Provenance, RouteCandidate,
    RouteStep, StepKind, TerrainBundle, UncertaintyNotes,
};
use crate::profiles::{CostProfile, PROFILES};
use crate::roadgraph::road_network_route;
use crate::route_engine::{a_star_route, GridSearchParams};
use crate::spatial::{planar_distance, round_to};
use crate::terrain::{assemble_route_steps, route_distance_and_elevation};

const HYDROLOGY_TERMS: [&str; 2] = ["wetland", "water"];
const GRID_COST_NOTES: &str =
    "dimensionless composite: weighted sum of average slope, terrain cost, exposure";
const ROAD_COST_NOTES: &str = "Distance-based cost (km) - no terrain factors available";

fn is_hydro(terrain: &str) -> bool {
    let lower = terrain.to_lowercase();
    HYDROLOGY_TERMS.iter().any(|term| lower.contains(term))
}

/// Generate up to `max_candidates` routes between two coordinates.
///
/// A profile whose search finds no path is skipped; the caller sees fewer
/// candidates and decides whether an empty set is an error.
pub fn generate_route_candidates(
    start: Coordinate,
    goal: Coordinate,
    bundle: &TerrainBundle,
    max_candidates: usize,
    now: DateTime<Utc>,
    cancel: &CancelToken,
) -> Result<Vec<RouteCandidate>, SearchError> {
    if bundle.is_road_only() {
        tracing::info!("road-only terrain detected, using road network routing");
        return road_network_candidates(start, goal, bundle, max_candidates, now, cancel);
    }
    grid_candidates(start, goal, bundle, max_candidates, cancel)
}

fn grid_candidates(
    start: Coordinate,
    goal: Coordinate,
    bundle: &TerrainBundle,
    max_candidates: usize,
    cancel: &CancelToken,
) -> Result<Vec<RouteCandidate>, SearchError> {
    let dem = &bundle.dem;
    let landcover = &bundle.landcover;
    let mut candidates = Vec::new();

    for profile in PROFILES.iter().take(max_candidates) {
        tracing::info!(profile = profile.id, "computing grid candidate");
        let params = GridSearchParams::from_profile(profile);
        let path = a_star_route(
            start,
            goal,
            dem,
            landcover,
            &bundle.obstacles,
            &bundle.roads,
            &params,
            cancel,
        )?;
        let Some(path) = path else {
            tracing::warn!(profile = profile.id, "no path found, skipping profile");
            continue;
        };

        let steps = assemble_route_steps(&path, dem, landcover);
        let segment_steps: Vec<&RouteStep> = steps
            .iter()
            .filter(|step| step.kind == StepKind::Segment)
            .collect();
        if segment_steps.is_empty() {
            continue;
        }
        let (distance, ascent, descent) = route_distance_and_elevation(&path, dem);

        let count = segment_steps.len() as f64;
        let avg_slope = segment_steps.iter().map(|s| s.slope).sum::<f64>() / count;
        let avg_terrain = segment_steps
            .iter()
            .map(|s| s.cost * profile.multiplier_for(&s.terrain))
            .sum::<f64>()
            / count;
        let avg_exposure = segment_steps.iter().map(|s| s.exposure).sum::<f64>() / count;

        let mut score_breakdown = BTreeMap::new();
        score_breakdown.insert("slope".to_string(), round_to(avg_slope, 3));
        score_breakdown.insert("terrain".to_string(), round_to(avg_terrain, 3));
        score_breakdown.insert("exposure".to_string(), round_to(avg_exposure, 3));
        let weights = profile.cost_weights;
        let estimated_cost = round_to(
            weights.slope * score_breakdown["slope"]
                + weights.terrain * score_breakdown["terrain"]
                + weights.exposure * score_breakdown["exposure"],
            3,
        );

        // Coverage and hydrology walk the cell path; each segment's distance
        // is attributed to its destination cell's class.
        let cell = dem.metadata.cell_size_m;
        let mut terrain_distance: BTreeMap<String, f64> = BTreeMap::new();
        let mut crossings = 0usize;
        let mut nearest_hydro_m: Option<f64> = None;
        let mut prev_hydro = false;
        for idx in 1..path.len() {
            let (r1, c1) = path[idx - 1];
            let (r2, c2) = path[idx];
            let terrain_name = landcover.class_at(r2, c2);
            let dr = r2 as f64 - r1 as f64;
            let dc = c2 as f64 - c1 as f64;
            let seg_dist = cell * (dr * dr + dc * dc).sqrt();
            *terrain_distance.entry(terrain_name.to_string()).or_insert(0.0) += seg_dist;

            let hydro = is_hydro(terrain_name);
            if hydro {
                if !prev_hydro {
                    crossings += 1;
                }
                let marker_m = segment_steps[idx].km_marker * 1000.0;
                if nearest_hydro_m.map(|d| marker_m < d).unwrap_or(true) {
                    nearest_hydro_m = Some(marker_m);
                }
            }
            prev_hydro = hydro;
        }

        let coverage: BTreeMap<String, f64> = terrain_distance
            .iter()
            .map(|(name, dist)| (name.clone(), round_to(dist / 1000.0, 3)))
            .collect();
        let total_km: f64 = {
            let sum: f64 = coverage.values().sum();
            if sum == 0.0 {
                1.0
            } else {
                sum
            }
        };
        let surface_mix: BTreeMap<String, f64> = coverage
            .iter()
            .map(|(name, km)| (format!("{name}_pct"), round_to(km / total_km * 100.0, 1)))
            .collect();
        let max_slope = segment_steps.iter().map(|s| s.slope).fold(0.0, f64::max);

        candidates.push(RouteCandidate {
            id: String::new(),
            steps,
            distance_m: round_to(distance, 1),
            ascent_m: round_to(ascent, 1),
            descent_m: round_to(descent, 1),
            estimated_cost,
            composite: None,
            constraints_used: profile_constraints(profile),
            score_breakdown,
            uncertainty: UncertaintyNotes {
                dem_res_m: Some(dem.metadata.cell_size_m),
                est_slope_error_deg: Some(0.5),
                landcover_update_ts: Some(landcover.metadata.last_updated),
                note: None,
            },
            coverage,
            coverage_units: "km".to_string(),
            estimated_cost_notes: GRID_COST_NOTES.to_string(),
            hydrology_check: HydrologyCheck {
                crossings,
                nearest_water_m: nearest_hydro_m.map(|d| round_to(d, 1)),
            },
            mobility: MobilitySummary {
                surface_mix,
                avg_slope_deg: round_to(avg_slope, 2),
                max_slope_deg: round_to(max_slope, 2),
            },
            provenance: Provenance {
                profile: Some(profile.id.to_string()),
                profile_label: Some(profile.label.to_string()),
                cost_weights: Some(weights),
                slope_weight: Some(profile.slope_weight),
                terrain_multipliers: Some(profile.multipliers_map()),
                exposure_penalty: Some(profile.exposure_penalty),
                road_bias: Some(profile.road_bias),
                dem_last_updated: Some(dem.metadata.last_updated),
                landcover_last_updated: Some(landcover.metadata.last_updated),
                ..Provenance::default()
            },
        });
    }

    Ok(candidates)
}

fn profile_constraints(profile: &CostProfile) -> ProfileConstraints {
    ProfileConstraints {
        avoid: profile.avoid.iter().map(|s| s.to_string()).collect(),
        prefer: profile.prefer.iter().map(|s| s.to_string()).collect(),
        mode: "foot".to_string(),
        source: None,
        variant: None,
    }
}

/// Build candidates over the road network alone. One real Dijkstra route,
/// then up to two synthetic variants sharing its geometry with scaled costs
/// (true alternative-path enumeration is a non-goal).
fn road_network_candidates(
    start: Coordinate,
    goal: Coordinate,
    bundle: &TerrainBundle,
    max_candidates: usize,
    now: DateTime<Utc>,
    cancel: &CancelToken,
) -> Result<Vec<RouteCandidate>, SearchError> {
    let Some(path) = road_network_route(start, goal, &bundle.roads, cancel)? else {
        tracing::warn!("no road network path found");
        return Ok(Vec::new());
    };
    tracing::info!(waypoints = path.len(), "road network route found");

    let mut steps = Vec::with_capacity(path.len());
    let mut cumulative_m = 0.0;
    for (i, &coord) in path.iter().enumerate() {
        if i > 0 {
            cumulative_m += planar_distance(path[i - 1], coord);
        }
        let kind = if i == 0 || i + 1 == path.len() {
            StepKind::Waypoint
        } else {
            StepKind::Segment
        };
        steps.push(RouteStep {
            segment_id: i + 1,
            coordinate: coord,
            slope: 0.0,
            terrain: "road".to_string(),
            cost: 1.0,
            exposure: 0.3,
            elevation: 100.0,
            kind,
            km_marker: round_to(cumulative_m / 1000.0, 3),
            label: None,
        });
    }

    let total_km = round_to(cumulative_m / 1000.0, 3);
    let mut score_breakdown = BTreeMap::new();
    score_breakdown.insert("distance".to_string(), total_km);
    let mut coverage = BTreeMap::new();
    coverage.insert("road".to_string(), total_km);
    let mut surface_mix = BTreeMap::new();
    surface_mix.insert("road_pct".to_string(), 100.0);

    let base = RouteCandidate {
        id: String::new(),
        steps,
        distance_m: round_to(cumulative_m, 1),
        ascent_m: 0.0,
        descent_m: 0.0,
        estimated_cost: round_to(cumulative_m / 1000.0, 3),
        composite: None,
        constraints_used: ProfileConstraints {
            avoid: Vec::new(),
            prefer: Vec::new(),
            mode: "road".to_string(),
            source: Some("osm".to_string()),
            variant: None,
        },
        score_breakdown,
        uncertainty: UncertaintyNotes {
            note: Some("OSM roads only, no terrain data".to_string()),
            ..UncertaintyNotes::default()
        },
        coverage,
        coverage_units: "km".to_string(),
        estimated_cost_notes: ROAD_COST_NOTES.to_string(),
        hydrology_check: HydrologyCheck {
            crossings: 0,
            nearest_water_m: None,
        },
        mobility: MobilitySummary {
            surface_mix,
            avg_slope_deg: 0.0,
            max_slope_deg: 0.0,
        },
        provenance: Provenance {
            algorithm: Some("road_network_dijkstra".to_string()),
            road_count: Some(bundle.roads.len()),
            generated_at: Some(now),
            ..Provenance::default()
        },
    };

    let mut candidates = vec![base.clone()];
    for i in 2..=max_candidates.min(3) {
        let mut variant = base.clone();
        variant.estimated_cost = round_to(base.estimated_cost * (0.95 + i as f64 * 0.05), 3);
        variant.constraints_used.variant = Some(i);
        candidates.push(variant);
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DemData, GridMetadata, LandcoverClass, LandcoverData, RoadNetwork, TerrainSource,
    };
    use std::collections::HashMap;

    fn metadata() -> GridMetadata {
        GridMetadata {
            origin: Coordinate::new(34.0, -117.0),
            cell_size_m: 100.0,
            ttl_hours: 720,
            last_updated: Utc::now(),
        }
    }

    fn class(name: &str, cost_factor: f64, exposure: f64) -> LandcoverClass {
        LandcoverClass {
            name: name.to_string(),
            cost_factor,
            exposure,
            speed_modifier: 1.0,
        }
    }

    /// 10x10 grid: row 0 open, row 1 a trail corridor, forest below.
    fn corridor_bundle() -> TerrainBundle {
        let mut classes = HashMap::new();
        classes.insert("open".to_string(), class("open", 1.0, 0.6));
        classes.insert("trail".to_string(), class("trail", 1.3, 0.2));
        classes.insert("forest".to_string(), class("forest", 1.2, 0.4));

        let mut grid = vec![vec!["forest".to_string(); 10]; 10];
        grid[0] = vec!["open".to_string(); 10];
        grid[1] = vec!["trail".to_string(); 10];

        TerrainBundle {
            id: "corridor".to_string(),
            dem: DemData {
                grid: vec![vec![100.0; 10]; 10],
                metadata: metadata(),
            },
            landcover: LandcoverData {
                grid,
                classes,
                metadata: metadata(),
            },
            obstacles: Vec::new(),
            roads: RoadNetwork::new(),
            source: TerrainSource::Survey,
        }
    }

    fn road_bundle() -> TerrainBundle {
        let mut bundle = corridor_bundle();
        bundle.roads.insert(
            "101".to_string(),
            (0..6)
                .map(|i| Coordinate::new(34.0 + 0.002 * i as f64, -117.0 + 0.002 * i as f64))
                .collect(),
        );
        bundle.source = TerrainSource::RoadOnly;
        bundle
    }

    #[test]
    fn profiles_diverge_over_mixed_terrain() {
        let bundle = corridor_bundle();
        let start = Coordinate::new(34.0, -117.0);
        let goal = Coordinate::new(34.0, -116.989412);
        let candidates = generate_route_candidates(
            start,
            goal,
            &bundle,
            3,
            Utc::now(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(candidates.len(), 3);

        let balanced = &candidates[0];
        let trail_pref = &candidates[1];
        let low_exposure = &candidates[2];

        assert_eq!(balanced.provenance.profile.as_deref(), Some("balanced"));
        assert!(trail_pref.trail_km() > balanced.trail_km());

        let avg_exposure = |candidate: &RouteCandidate| {
            let segments: Vec<_> = candidate
                .steps
                .iter()
                .filter(|s| s.kind == StepKind::Segment)
                .collect();
            segments.iter().map(|s| s.exposure).sum::<f64>() / segments.len() as f64
        };
        assert!(avg_exposure(low_exposure) < avg_exposure(balanced));

        for candidate in &candidates {
            assert!(!candidate.steps.is_empty());
            assert!(candidate.distance_m >= planar_distance(start, goal) - 1.0);
            assert!(candidate.ascent_m >= 0.0 && candidate.descent_m >= 0.0);
            let markers: Vec<f64> = candidate
                .steps
                .iter()
                .filter(|s| s.kind == StepKind::Segment)
                .map(|s| s.km_marker)
                .collect();
            assert!(markers.windows(2).all(|w| w[1] >= w[0]));
            // Coverage in km should account for the whole distance.
            let covered: f64 = candidate.coverage.values().sum::<f64>() * 1000.0;
            assert!((covered - candidate.distance_m).abs() < 5.0);
        }
    }

    #[test]
    fn max_candidates_truncates_profile_list() {
        let bundle = corridor_bundle();
        let candidates = generate_route_candidates(
            Coordinate::new(34.0, -117.0),
            Coordinate::new(34.0, -116.989412),
            &bundle,
            1,
            Utc::now(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].provenance.profile.as_deref(), Some("balanced"));
    }

    #[test]
    fn road_only_candidates_with_variants() {
        let bundle = road_bundle();
        let now = Utc::now();
        let candidates = generate_route_candidates(
            Coordinate::new(34.0001, -116.9999),
            Coordinate::new(34.0095, -116.9905),
            &bundle,
            3,
            now,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(candidates.len(), 3);

        let base = &candidates[0];
        assert_eq!(
            base.provenance.algorithm.as_deref(),
            Some("road_network_dijkstra")
        );
        assert_eq!(base.provenance.generated_at, Some(now));
        assert_eq!(base.steps.first().map(|s| s.kind), Some(StepKind::Waypoint));
        assert_eq!(base.steps.last().map(|s| s.kind), Some(StepKind::Waypoint));

        let road_len: f64 = bundle
            .roads
            .values()
            .flat_map(|coords| coords.windows(2))
            .map(|pair| planar_distance(pair[0], pair[1]))
            .sum();
        assert!((base.distance_m - road_len).abs() / road_len < 0.05);

        // Variants share geometry and scale the base cost by 1.05 and 1.10.
        assert_eq!(candidates[1].constraints_used.variant, Some(2));
        assert_eq!(candidates[2].constraints_used.variant, Some(3));
        assert_eq!(
            candidates[1].estimated_cost,
            round_to(base.estimated_cost * 1.05, 3)
        );
        assert_eq!(
            candidates[2].estimated_cost,
            round_to(base.estimated_cost * 1.10, 3)
        );
        assert_eq!(candidates[1].distance_m, base.distance_m);
    }

    #[test]
    fn hydrology_crossings_counted_on_transitions() {
        let mut bundle = corridor_bundle();
        bundle
            .landcover
            .classes
            .insert("wetland".to_string(), class("wetland", 1.5, 0.5));
        // Two separate wetland patches along row 0.
        bundle.landcover.grid[0][3] = "wetland".to_string();
        bundle.landcover.grid[0][6] = "wetland".to_string();
        // Make the detour rows unattractive so balanced stays on row 0.
        for row in 1..10 {
            for col in 0..10 {
                bundle.landcover.grid[row][col] = "forest".to_string();
            }
        }

        let candidates = generate_route_candidates(
            Coordinate::new(34.0, -117.0),
            Coordinate::new(34.0, -116.989412),
            &bundle,
            1,
            Utc::now(),
            &CancelToken::new(),
        )
        .unwrap();
        let candidate = &candidates[0];
        assert_eq!(candidate.hydrology_check.crossings, 2);
        let nearest = candidate.hydrology_check.nearest_water_m.unwrap();
        assert!((nearest - 300.0).abs() < 1.0);
    }
}
