//! Engine façade and per-request mutable state.
//!
//! A `RoutePlanner` owns one terrain bundle plus an explicit [`EngineState`].
//! Operations validate referenced route ids against that state and fail
//! loudly on unknown ids or missing prerequisites. A single planner is not
//! safe for concurrent invocation; hosts serialize calls per planner or
//! build one per request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use overland_core::models::{
    Alternate, ConstraintsSummary, Coordinate, HydrologyCheck, PaceEstimate, RiskWeights,
    RouteCandidate, RouteRisk, SelectionConstraints, SelectionPolicy, SelectionResult, TravelMode,
};
use overland_core::spatial::round_to;
use overland_core::{generate_route_candidates, pace, risk, select_route, CancelToken, TerrainBundle};

use crate::error::EngineError;
use crate::exporter::{self, ExportArtifacts};
use crate::loader::{provenance_status, ProvenanceStatus};

// ========== CONSTANT RESPONSE DESCRIPTORS ==========

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Handling {
    pub sensitivity: &'static str,
    pub ttl_hours: i64,
}

pub const HANDLING: Handling = Handling {
    sensitivity: "UNCLASSIFIED",
    ttl_hours: 720,
};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SchemaDescriptor {
    pub version: &'static str,
    pub hash: &'static str,
}

pub const SCHEMA: SchemaDescriptor = SchemaDescriptor {
    version: "1.2.0",
    hash: "sha256:5a0d8a2f96f6c0b8f271f98f6b3a9a8bf5a6a338d250b1d7f4c684a8739d4d5a",
};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CrsDescriptor {
    pub name: &'static str,
    pub order: &'static str,
}

pub const CRS: CrsDescriptor = CrsDescriptor {
    name: "EPSG:4326",
    order: "lat,lon",
};

// ========== STATE ==========

/// Mutable per-planner state. Every key in `risks` and `paces` is a key in
/// `routes`; the route counter is monotonic and never reset while the
/// planner lives.
#[derive(Debug, Default)]
pub struct EngineState {
    pub routes: BTreeMap<String, RouteCandidate>,
    pub risks: BTreeMap<String, RouteRisk>,
    pub paces: BTreeMap<String, PaceEstimate>,
    pub selection: Option<SelectionResult>,
    route_counter: u64,
}

impl EngineState {
    fn next_route_id(&mut self) -> String {
        self.route_counter += 1;
        format!("route-{}", self.route_counter)
    }
}

// ========== PAYLOADS ==========

#[derive(Debug, Serialize)]
pub struct GenerateProvenance {
    pub dem_last_updated: DateTime<Utc>,
    pub landcover_last_updated: DateTime<Utc>,
    pub ttl_status: Vec<ProvenanceStatus>,
}

#[derive(Debug, Serialize)]
pub struct GeneratePayload {
    pub handling: Handling,
    pub schema: SchemaDescriptor,
    pub crs: CrsDescriptor,
    pub routes: Vec<RouteCandidate>,
    pub provenance: GenerateProvenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskEntry {
    pub route_id: String,
    pub slope: f64,
    pub exposure: f64,
    pub hydrology: f64,
    pub weights: RiskWeights,
    pub formula: String,
    pub components: BTreeMap<String, f64>,
    pub hydrology_check: HydrologyCheck,
    pub aggregate: f64,
}

fn risk_entry(risk: &RouteRisk) -> RiskEntry {
    let mut components = BTreeMap::new();
    components.insert("slope".to_string(), risk.slope_risk);
    components.insert("exposure".to_string(), risk.exposure_risk);
    components.insert("hydrology".to_string(), risk.hydrology_risk);
    RiskEntry {
        route_id: risk.route_id.clone(),
        slope: risk.slope_risk,
        exposure: risk.exposure_risk,
        hydrology: risk.hydrology_risk,
        weights: risk.weights,
        formula: risk.formula.clone(),
        components,
        hydrology_check: risk.hydrology_check.clone(),
        aggregate: risk.aggregate(),
    }
}

#[derive(Debug, Serialize)]
pub struct RiskPayload {
    pub handling: Handling,
    pub schema: SchemaDescriptor,
    pub weights: RiskWeights,
    pub risks: Vec<RiskEntry>,
}

#[derive(Debug, Serialize)]
pub struct PacePayload {
    pub handling: Handling,
    pub schema: SchemaDescriptor,
    pub pace_estimates: Vec<PaceEstimate>,
}

#[derive(Debug, Serialize)]
pub struct SelectionBody {
    pub route: RouteCandidate,
    pub risk: RiskEntry,
    pub pace: PaceEstimate,
    pub rationale: String,
    pub constraints: ConstraintsSummary,
    pub alternates: Vec<Alternate>,
    pub score_definition: String,
    pub tie_breaker: String,
    pub policy: SelectionPolicy,
}

#[derive(Debug, Serialize)]
pub struct SelectPayload {
    pub handling: Handling,
    pub schema: SchemaDescriptor,
    pub selection: SelectionBody,
}

#[derive(Debug, Serialize)]
pub struct ExportPayload {
    pub handling: Handling,
    pub schema: SchemaDescriptor,
    #[serde(flatten)]
    pub artifacts: ExportArtifacts,
}

// ========== PLANNER ==========

pub struct RoutePlanner {
    bundle: TerrainBundle,
    state: EngineState,
    cancel: CancelToken,
}

impl RoutePlanner {
    pub fn new(bundle: TerrainBundle) -> Self {
        Self {
            bundle,
            state: EngineState::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn bundle(&self) -> &TerrainBundle {
        &self.bundle
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Token shared with the pathfinders; cancelling it aborts the in-flight
    /// search without touching state.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Generate candidate routes, replacing any prior state. Ids continue
    /// from the planner-wide counter, so repeated generations never reuse
    /// an id.
    pub fn generate_routes(
        &mut self,
        start: Coordinate,
        end: Coordinate,
        max_candidates: usize,
    ) -> Result<GeneratePayload, EngineError> {
        let now = Utc::now();
        let mut candidates =
            generate_route_candidates(start, end, &self.bundle, max_candidates, now, &self.cancel)?;
        if candidates.is_empty() {
            return Err(EngineError::NoViableRoute);
        }

        self.state.routes.clear();
        self.state.risks.clear();
        self.state.paces.clear();
        self.state.selection = None;
        for candidate in &mut candidates {
            let id = self.state.next_route_id();
            candidate.id = id.clone();
            candidate.provenance.sequence_id = Some(id.clone());
            self.state.routes.insert(id, candidate.clone());
        }
        tracing::info!(candidates = candidates.len(), "route generation complete");

        Ok(GeneratePayload {
            handling: HANDLING,
            schema: SCHEMA,
            crs: CRS,
            provenance: GenerateProvenance {
                dem_last_updated: self.bundle.dem.metadata.last_updated,
                landcover_last_updated: self.bundle.landcover.metadata.last_updated,
                ttl_status: provenance_status(&self.bundle, now),
            },
            routes: candidates,
        })
    }

    fn resolve_ids(&self, route_ids: Option<&[String]>) -> Result<Vec<String>, EngineError> {
        match route_ids {
            Some(ids) => {
                let missing: Vec<&str> = ids
                    .iter()
                    .filter(|id| !self.state.routes.contains_key(id.as_str()))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    return Err(EngineError::UnknownRoutes(missing.join(", ")));
                }
                Ok(ids.to_vec())
            }
            None => Ok(self.state.routes.keys().cloned().collect()),
        }
    }

    /// Score the referenced routes for risk and stamp each candidate's
    /// composite (`estimated_cost * (1 + aggregate)`).
    pub fn evaluate_risk(
        &mut self,
        route_ids: Option<&[String]>,
    ) -> Result<RiskPayload, EngineError> {
        let ids = self.resolve_ids(route_ids)?;
        let risks = risk::evaluate_routes(ids.iter().map(|id| &self.state.routes[id]));

        for (id, entry) in &risks {
            if let Some(candidate) = self.state.routes.get_mut(id) {
                candidate.composite = Some(round_to(
                    candidate.estimated_cost * (1.0 + entry.aggregate()),
                    3,
                ));
            }
        }

        let entries: Vec<RiskEntry> = ids
            .iter()
            .filter_map(|id| risks.get(id))
            .map(risk_entry)
            .collect();
        self.state.risks.extend(risks);

        Ok(RiskPayload {
            handling: HANDLING,
            schema: SCHEMA,
            weights: risk::RISK_WEIGHTS,
            risks: entries,
        })
    }

    pub fn estimate_pace(
        &mut self,
        mode: TravelMode,
        load_kg: f64,
        route_ids: Option<&[String]>,
    ) -> Result<PacePayload, EngineError> {
        let ids = self.resolve_ids(route_ids)?;
        let mut estimates = Vec::new();
        for id in &ids {
            let estimate = pace::estimate_travel_time(&self.state.routes[id], mode, load_kg);
            self.state.paces.insert(id.clone(), estimate.clone());
            estimates.push(estimate);
        }
        Ok(PacePayload {
            handling: HANDLING,
            schema: SCHEMA,
            pace_estimates: estimates,
        })
    }

    /// Select under constraints. Requires risk and pace data for every
    /// referenced route.
    pub fn select(
        &mut self,
        route_ids: Option<&[String]>,
        constraints: SelectionConstraints,
    ) -> Result<SelectPayload, EngineError> {
        let ids = self.resolve_ids(route_ids)?;
        let missing_risk: Vec<&str> = ids
            .iter()
            .filter(|id| !self.state.risks.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();
        if !missing_risk.is_empty() {
            return Err(EngineError::MissingRisk(missing_risk.join(", ")));
        }
        let missing_pace: Vec<&str> = ids
            .iter()
            .filter(|id| !self.state.paces.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();
        if !missing_pace.is_empty() {
            return Err(EngineError::MissingPace(missing_pace.join(", ")));
        }

        let routes: Vec<&RouteCandidate> = ids.iter().map(|id| &self.state.routes[id]).collect();
        let result = select_route(
            &routes,
            &self.state.risks,
            &self.state.paces,
            &constraints,
            Utc::now(),
        )
        .map_err(|err| EngineError::Unsatisfiable(err.rationale))?;

        let body = SelectionBody {
            route: result.selected_route.clone(),
            risk: risk_entry(&result.risk),
            pace: result.pace.clone(),
            rationale: result.rationale.clone(),
            constraints: result.constraints.clone(),
            alternates: result.alternates.clone(),
            score_definition: result.score_definition.clone(),
            tie_breaker: result.tie_breaker.clone(),
            policy: result.policy.clone(),
        };
        self.state.selection = Some(result);

        Ok(SelectPayload {
            handling: HANDLING,
            schema: SCHEMA,
            selection: body,
        })
    }

    /// Export the selected route's artifacts into `export_root`.
    pub fn export(
        &self,
        basename: Option<&str>,
        export_root: &Path,
    ) -> Result<ExportPayload, EngineError> {
        let Some(selection) = &self.state.selection else {
            return Err(EngineError::NoSelection);
        };
        let artifacts = exporter::export_all(selection, export_root, basename, Utc::now())?;
        Ok(ExportPayload {
            handling: HANDLING,
            schema: SCHEMA,
            artifacts,
        })
    }
}
