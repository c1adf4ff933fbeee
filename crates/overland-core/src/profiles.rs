//! Named cost profiles for grid candidate generation.
//!
//! Profiles are applied in a fixed order; `max_candidates` truncates the
//! list, so a single-candidate request always runs `balanced`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weights for composing the dimensionless estimated cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostWeights {
    pub slope: f64,
    pub terrain: f64,
    pub exposure: f64,
}

/// One parameterization of the grid A* cost model.
#[derive(Debug, Clone)]
pub struct CostProfile {
    pub id: &'static str,
    pub label: &'static str,
    pub slope_weight: f64,
    /// Per-class multipliers applied on top of the landcover cost factor.
    pub terrain_multipliers: &'static [(&'static str, f64)],
    pub exposure_penalty: f64,
    pub road_bias: f64,
    pub avoid: &'static [&'static str],
    pub prefer: &'static [&'static str],
    pub cost_weights: CostWeights,
}

impl CostProfile {
    pub fn multiplier_for(&self, class: &str) -> f64 {
        self.terrain_multipliers
            .iter()
            .find(|(name, _)| *name == class)
            .map(|(_, factor)| *factor)
            .unwrap_or(1.0)
    }

    pub fn multipliers_map(&self) -> BTreeMap<String, f64> {
        self.terrain_multipliers
            .iter()
            .map(|(name, factor)| (name.to_string(), *factor))
            .collect()
    }
}

pub const PROFILES: [CostProfile; 3] = [
    CostProfile {
        id: "balanced",
        label: "Balanced surfaces",
        slope_weight: 1.0,
        terrain_multipliers: &[("trail", 0.75), ("road", 0.8)],
        exposure_penalty: 0.05,
        road_bias: 1.0,
        avoid: &[],
        prefer: &["mixed"],
        cost_weights: CostWeights {
            slope: 0.40,
            terrain: 0.35,
            exposure: 0.25,
        },
    },
    CostProfile {
        id: "trail_pref",
        label: "Prefer trails",
        slope_weight: 0.9,
        terrain_multipliers: &[("trail", 0.6), ("road", 0.85), ("forest", 1.1), ("open", 1.2)],
        exposure_penalty: 0.03,
        road_bias: 0.8,
        avoid: &[],
        prefer: &["trail"],
        cost_weights: CostWeights {
            slope: 0.35,
            terrain: 0.45,
            exposure: 0.20,
        },
    },
    CostProfile {
        id: "low_exposure",
        label: "Limit exposure",
        slope_weight: 1.2,
        terrain_multipliers: &[("open", 1.4), ("trail", 0.85), ("road", 0.8)],
        exposure_penalty: 0.12,
        road_bias: 1.1,
        avoid: &["open"],
        prefer: &["cover"],
        cost_weights: CostWeights {
            slope: 0.45,
            terrain: 0.25,
            exposure: 0.30,
        },
    },
];
