//! Route risk scoring.
//!
//! Three independent components in [0, 1], combined by fixed weights. Scores
//! are deterministic for identical inputs; an empty step list scores zero on
//! every component.

use std::collections::BTreeMap;

use crate::models::{RiskWeights, RouteCandidate, RouteRisk, RouteStep, StepKind};
use crate::spatial::round_to;

pub const RISK_WEIGHTS: RiskWeights = RiskWeights {
    slope: 0.45,
    exposure: 0.35,
    hydrology: 0.20,
};

pub const RISK_FORMULA: &str = "sum(w[i] * component[i])";

fn normalized(value: f64, upper: f64) -> f64 {
    if upper == 0.0 {
        return 0.0;
    }
    (value / upper).clamp(0.0, 1.0)
}

fn segment_steps(steps: &[RouteStep]) -> Vec<&RouteStep> {
    steps
        .iter()
        .filter(|step| step.kind == StepKind::Segment)
        .collect()
}

/// 60% average slope against a 15 degree ceiling, 40% worst slope against 25.
pub fn slope_risk(steps: &[RouteStep]) -> f64 {
    let segments = segment_steps(steps);
    if segments.is_empty() {
        return 0.0;
    }
    let worst = segments.iter().map(|s| s.slope).fold(0.0, f64::max);
    let avg = segments.iter().map(|s| s.slope).sum::<f64>() / segments.len() as f64;
    let score = 0.6 * normalized(avg, 15.0) + 0.4 * normalized(worst, 25.0);
    round_to(score.min(1.0), 3)
}

pub fn exposure_risk(steps: &[RouteStep]) -> f64 {
    let segments = segment_steps(steps);
    if segments.is_empty() {
        return 0.0;
    }
    let avg = segments.iter().map(|s| s.exposure).sum::<f64>() / segments.len() as f64;
    round_to(normalized(avg, 1.0), 3)
}

/// Water steps weigh double wetland steps, normalized by segment count.
pub fn hydrology_risk(steps: &[RouteStep]) -> f64 {
    let segments = segment_steps(steps);
    if segments.is_empty() {
        return 0.0;
    }
    let water = segments
        .iter()
        .filter(|s| s.terrain.to_lowercase().contains("water"))
        .count();
    let wetland = segments
        .iter()
        .filter(|s| s.terrain.to_lowercase().contains("wetland"))
        .count();
    let score = normalized((water * 2 + wetland) as f64, segments.len().max(1) as f64);
    round_to(score, 3)
}

pub fn evaluate_routes<'a, I>(routes: I) -> BTreeMap<String, RouteRisk>
where
    I: IntoIterator<Item = &'a RouteCandidate>,
{
    let mut risk_map = BTreeMap::new();
    for route in routes {
        let risk = RouteRisk {
            route_id: route.id.clone(),
            slope_risk: slope_risk(&route.steps),
            exposure_risk: exposure_risk(&route.steps),
            hydrology_risk: hydrology_risk(&route.steps),
            weights: RISK_WEIGHTS,
            formula: RISK_FORMULA.to_string(),
            hydrology_check: route.hydrology_check.clone(),
        };
        risk_map.insert(route.id.clone(), risk);
    }
    risk_map
}
