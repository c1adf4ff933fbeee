//! Naismith-derived pace estimation.

use crate::models::{PaceEstimate, RouteCandidate, TravelMode};
use crate::spatial::round_to;

/// Minimum adjusted speed; heavy loads over bad ground still move.
pub const MIN_SPEED_KMH: f64 = 1.5;

/// Adjusted speed in km/h: the mode's base speed minus ascent, descent,
/// load, and steepest-step penalties, floored at [`MIN_SPEED_KMH`].
pub fn naismith_adjusted_speed(route: &RouteCandidate, mode: TravelMode, load_kg: f64) -> f64 {
    let base = mode.base_speed_kmh();
    let ascent_penalty = route.ascent_m / 600.0;
    let descent_penalty = ((route.descent_m - 300.0) / 800.0).max(0.0);
    let load_penalty = load_kg / 20.0 * 0.5;
    let slope_penalty = route.max_step_slope() / 40.0;

    let adjusted = base - ascent_penalty - descent_penalty - load_penalty - slope_penalty;
    adjusted.max(MIN_SPEED_KMH)
}

pub fn estimate_travel_time(
    route: &RouteCandidate,
    mode: TravelMode,
    load_kg: f64,
) -> PaceEstimate {
    let speed_kmh = naismith_adjusted_speed(route, mode, load_kg);
    let travel_time_minutes = (route.distance_m / 1000.0) / speed_kmh * 60.0;
    let assumptions = vec![
        format!("Naismith base {} km/h", mode.base_speed_kmh()),
        "+30% time per deg >10 deg equivalent".to_string(),
        format!("+10% time per 10 kg load (applied to {load_kg} kg)"),
        "Rest ratio 10 min per 60 min travel".to_string(),
    ];
    PaceEstimate {
        route_id: route.id.clone(),
        travel_time_minutes: round_to(travel_time_minutes, 1),
        mode,
        load_kg,
        base_speed_kmh: round_to(speed_kmh, 2),
        assumptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Coordinate, HydrologyCheck, MobilitySummary, ProfileConstraints, Provenance, RouteStep,
        StepKind, UncertaintyNotes,
    };
    use std::collections::BTreeMap;

    fn candidate(distance_m: f64, ascent_m: f64, max_slope: f64) -> RouteCandidate {
        RouteCandidate {
            id: "route-1".to_string(),
            steps: vec![RouteStep {
                segment_id: 1,
                coordinate: Coordinate::new(34.0, -117.0),
                slope: max_slope,
                terrain: "open".to_string(),
                cost: 1.0,
                exposure: 0.5,
                elevation: 100.0,
                kind: StepKind::Segment,
                km_marker: 0.0,
                label: None,
            }],
            distance_m,
            ascent_m,
            descent_m: 0.0,
            estimated_cost: 1.0,
            composite: None,
            constraints_used: ProfileConstraints::default(),
            score_breakdown: BTreeMap::new(),
            uncertainty: UncertaintyNotes::default(),
            coverage: BTreeMap::new(),
            coverage_units: "km".to_string(),
            estimated_cost_notes: String::new(),
            hydrology_check: HydrologyCheck {
                crossings: 0,
                nearest_water_m: None,
            },
            mobility: MobilitySummary {
                surface_mix: BTreeMap::new(),
                avg_slope_deg: max_slope,
                max_slope_deg: max_slope,
            },
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn flat_unloaded_foot_pace() {
        let route = candidate(5000.0, 0.0, 0.0);
        let pace = estimate_travel_time(&route, TravelMode::Foot, 0.0);
        assert_eq!(pace.base_speed_kmh, 5.0);
        assert_eq!(pace.travel_time_minutes, 60.0);
        assert_eq!(pace.assumptions.len(), 4);
    }

    #[test]
    fn wheeled_is_faster_than_foot() {
        let route = candidate(5000.0, 0.0, 0.0);
        let foot = estimate_travel_time(&route, TravelMode::Foot, 25.0);
        let wheeled = estimate_travel_time(&route, TravelMode::Wheeled, 25.0);
        assert!(wheeled.travel_time_minutes < foot.travel_time_minutes);
    }

    #[test]
    fn heavier_load_never_speeds_up() {
        let route = candidate(8000.0, 200.0, 5.0);
        let mut last = 0.0;
        for load in [0.0, 10.0, 25.0, 40.0, 80.0, 200.0] {
            let pace = estimate_travel_time(&route, TravelMode::Foot, load);
            assert!(pace.travel_time_minutes >= last);
            last = pace.travel_time_minutes;
        }
    }

    #[test]
    fn more_ascent_never_speeds_up() {
        let mut last = 0.0;
        for ascent in [0.0, 100.0, 300.0, 600.0, 1500.0] {
            let route = candidate(8000.0, ascent, 5.0);
            let pace = estimate_travel_time(&route, TravelMode::Foot, 25.0);
            assert!(pace.travel_time_minutes >= last);
            last = pace.travel_time_minutes;
        }
    }

    #[test]
    fn speed_is_floored() {
        let route = candidate(1000.0, 5000.0, 45.0);
        let pace = estimate_travel_time(&route, TravelMode::Foot, 100.0);
        assert_eq!(pace.base_speed_kmh, MIN_SPEED_KMH);
        assert!(pace.travel_time_minutes > 0.0);
    }

    #[test]
    fn descent_penalty_kicks_in_past_grace() {
        let mut route = candidate(5000.0, 0.0, 0.0);
        route.descent_m = 200.0;
        let gentle = estimate_travel_time(&route, TravelMode::Foot, 0.0);
        route.descent_m = 1100.0;
        let steep = estimate_travel_time(&route, TravelMode::Foot, 0.0);
        assert_eq!(gentle.base_speed_kmh, 5.0);
        assert_eq!(steep.base_speed_kmh, 4.0);
    }
}
