//! Core data models for the overland planning engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::spatial;

/// A geographic position in decimal degrees, always (lat, lon) order.
///
/// Imported feature geometry (road lines, obstacle rings) arrives as
/// (lon, lat) and is swapped exactly once at the loader boundary; everything
/// downstream assumes (lat, lon).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Shared metadata for the elevation and landcover grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMetadata {
    /// Coordinate of cell (0, 0).
    pub origin: Coordinate,
    pub cell_size_m: f64,
    pub ttl_hours: i64,
    pub last_updated: DateTime<Utc>,
}

impl GridMetadata {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_updated + Duration::hours(self.ttl_hours)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

/// Digital elevation model: dense row-major grid of elevations in meters.
///
/// All rows have equal width; the loader rejects ragged grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemData {
    pub grid: Vec<Vec<f64>>,
    pub metadata: GridMetadata,
}

impl DemData {
    pub fn height(&self) -> usize {
        self.grid.len()
    }

    pub fn width(&self) -> usize {
        self.grid.first().map(|row| row.len()).unwrap_or(0)
    }

    pub fn elevation(&self, row: usize, col: usize) -> f64 {
        self.grid[row][col]
    }
}

/// Attributes of one landcover class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandcoverClass {
    pub name: String,
    pub cost_factor: f64,
    pub exposure: f64,
    pub speed_modifier: f64,
}

/// Landcover classification grid plus the class attribute table.
///
/// Shares origin, cell size, and dimensions with the DEM of the same bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandcoverData {
    pub grid: Vec<Vec<String>>,
    pub classes: HashMap<String, LandcoverClass>,
    pub metadata: GridMetadata,
}

impl LandcoverData {
    pub fn class_at(&self, row: usize, col: usize) -> &str {
        &self.grid[row][col]
    }

    pub fn cost_factor(&self, row: usize, col: usize) -> f64 {
        self.classes
            .get(self.class_at(row, col))
            .map(|class| class.cost_factor)
            .unwrap_or(1.0)
    }

    pub fn exposure(&self, row: usize, col: usize) -> f64 {
        self.classes
            .get(self.class_at(row, col))
            .map(|class| class.exposure)
            .unwrap_or(0.0)
    }
}

/// A polygonal exclusion zone, vertices in (lat, lon) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub polygon: Vec<Coordinate>,
    #[serde(default = "default_obstacle_kind")]
    pub kind: String,
    #[serde(default)]
    pub buffer_m: f64,
}

fn default_obstacle_kind() -> String {
    "obstacle".to_string()
}

impl Obstacle {
    /// Point-in-polygon test honoring the load-time buffer: a point counts as
    /// contained when it is inside the ring or within `buffer_m` planar
    /// meters of any edge.
    pub fn contains(&self, point: Coordinate) -> bool {
        if self.polygon.len() < 3 {
            return false;
        }
        if spatial::polygon_contains(&self.polygon, point) {
            return true;
        }
        if self.buffer_m > 0.0 {
            let n = self.polygon.len();
            for i in 0..n {
                let a = self.polygon[i];
                let b = self.polygon[(i + 1) % n];
                if spatial::point_segment_distance_m(point, a, b) <= self.buffer_m {
                    return true;
                }
            }
        }
        false
    }
}

/// Imported road network: road id to its ordered vertex sequence.
///
/// BTreeMap keeps iteration deterministic across runs.
pub type RoadNetwork = BTreeMap<String, Vec<Coordinate>>;

/// How a terrain bundle was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainSource {
    /// Full survey bundle with real DEM and landcover grids.
    Survey,
    /// Road-only import carrying placeholder grids.
    RoadOnly,
}

/// One operational area: elevation, landcover, obstacles, and roads.
#[derive(Debug, Clone)]
pub struct TerrainBundle {
    pub id: String,
    pub dem: DemData,
    pub landcover: LandcoverData,
    pub obstacles: Vec<Obstacle>,
    pub roads: RoadNetwork,
    pub source: TerrainSource,
}

impl TerrainBundle {
    /// Whether candidate generation should use the road graph instead of the
    /// grids. The explicit source flag wins; bundles loaded from disk fall
    /// back to the placeholder-shaped-grid heuristic.
    pub fn is_road_only(&self) -> bool {
        if self.roads.is_empty() {
            return false;
        }
        self.source == TerrainSource::RoadOnly
            || (self.dem.height() <= 10 && self.dem.width() <= 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Segment,
    Checkpoint,
    Waypoint,
}

/// One annotated point along a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
    pub segment_id: usize,
    pub coordinate: Coordinate,
    /// Local slope in degrees.
    pub slope: f64,
    pub terrain: String,
    /// Unit traversal cost from the landcover class table.
    pub cost: f64,
    pub exposure: f64,
    pub elevation: f64,
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Cumulative distance from the start in kilometers, non-decreasing.
    pub km_marker: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Constraint hints attached to the profile that produced a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConstraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefer: Vec<String>,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrologyCheck {
    pub crossings: usize,
    pub nearest_water_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilitySummary {
    /// Surface share by class, percent of total distance.
    pub surface_mix: BTreeMap<String, f64>,
    pub avg_slope_deg: f64,
    pub max_slope_deg: f64,
}

/// Uncertainty notes attached to a candidate. Grid candidates carry the DEM
/// resolution fields; road-only candidates carry a free-form note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UncertaintyNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dem_res_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub est_slope_error_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landcover_update_ts: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Provenance captured with a candidate. Only the fields relevant to the
/// producing pathfinder are populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_weights: Option<crate::profiles::CostWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain_multipliers: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_bias: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dem_last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landcover_last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Engine-assigned route id, mirrored here for transported artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
}

/// One scored candidate route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Stable `route-N` id. Assigned by the engine from its monotonic
    /// counter; the generator leaves this empty.
    pub id: String,
    pub steps: Vec<RouteStep>,
    pub distance_m: f64,
    pub ascent_m: f64,
    pub descent_m: f64,
    /// Dimensionless composite of slope, terrain, and exposure averages.
    pub estimated_cost: f64,
    /// `estimated_cost * (1 + aggregate_risk)`; populated by risk evaluation.
    pub composite: Option<f64>,
    pub constraints_used: ProfileConstraints,
    pub score_breakdown: BTreeMap<String, f64>,
    pub uncertainty: UncertaintyNotes,
    /// Distance covered per landcover class.
    pub coverage: BTreeMap<String, f64>,
    pub coverage_units: String,
    pub estimated_cost_notes: String,
    pub hydrology_check: HydrologyCheck,
    pub mobility: MobilitySummary,
    #[serde(default)]
    pub provenance: Provenance,
}

impl RouteCandidate {
    pub fn max_step_slope(&self) -> f64 {
        self.steps.iter().map(|step| step.slope).fold(0.0, f64::max)
    }

    /// Trail distance covered, in km. Used as the final selection tie-break.
    pub fn trail_km(&self) -> f64 {
        self.coverage.get("trail").copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskWeights {
    pub slope: f64,
    pub exposure: f64,
    pub hydrology: f64,
}

/// Per-route risk components, each in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRisk {
    pub route_id: String,
    pub slope_risk: f64,
    pub exposure_risk: f64,
    pub hydrology_risk: f64,
    pub weights: RiskWeights,
    pub formula: String,
    pub hydrology_check: HydrologyCheck,
}

impl RouteRisk {
    pub fn aggregate(&self) -> f64 {
        self.weights.slope * self.slope_risk
            + self.weights.exposure * self.exposure_risk
            + self.weights.hydrology * self.hydrology_risk
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Foot,
    Wheeled,
}

impl TravelMode {
    pub fn base_speed_kmh(&self) -> f64 {
        match self {
            TravelMode::Foot => 5.0,
            TravelMode::Wheeled => 8.0,
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelMode::Foot => write!(f, "foot"),
            TravelMode::Wheeled => write!(f, "wheeled"),
        }
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "foot" => Ok(TravelMode::Foot),
            "wheeled" => Ok(TravelMode::Wheeled),
            other => Err(format!("unknown travel mode '{other}' (expected foot or wheeled)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaceEstimate {
    pub route_id: String,
    pub travel_time_minutes: f64,
    pub mode: TravelMode,
    pub load_kg: f64,
    pub base_speed_kmh: f64,
    pub assumptions: Vec<String>,
}

/// Commander-supplied selection constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConstraints {
    #[serde(default)]
    pub must_arrive_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avoid_slope_degrees: Option<f64>,
    #[serde(default = "default_prefer_low_risk")]
    pub prefer_low_risk: bool,
    #[serde(default)]
    pub max_distance_m: Option<f64>,
}

fn default_prefer_low_risk() -> bool {
    true
}

impl Default for SelectionConstraints {
    fn default() -> Self {
        Self {
            must_arrive_before: None,
            avoid_slope_degrees: None,
            prefer_low_risk: true,
            max_distance_m: None,
        }
    }
}

/// Summary of the constraints applied during selection; `None` fields are
/// omitted from payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlt: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_slope_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_m: Option<f64>,
    pub preferred: String,
}

/// A non-selected candidate with the reasons it lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternate {
    pub route_id: String,
    pub score: f64,
    pub rationale: String,
    /// Sorted, de-duplicated categorical codes.
    pub reason_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub id: String,
    pub composite: String,
    pub tiebreakers: Vec<String>,
}

/// Outcome of constraint-driven selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected_route: RouteCandidate,
    pub risk: RouteRisk,
    pub pace: PaceEstimate,
    pub rationale: String,
    pub constraints: ConstraintsSummary,
    pub alternates: Vec<Alternate>,
    pub score_definition: String,
    pub tie_breaker: String,
    pub policy: SelectionPolicy,
}
