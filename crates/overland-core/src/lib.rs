//! Overland Core - Pure logic for ground route planning
//!
//! This crate contains the terrain data model and the planning algorithms
//! with NO filesystem or network dependencies: the grid A* and road-graph
//! pathfinders, candidate generation, risk scoring, pace estimation, and
//! constraint-driven selection.

pub mod cancel;
pub mod candidates;
pub mod error;
pub mod models;
pub mod pace;
pub mod profiles;
pub mod risk;
pub mod roadgraph;
pub mod route_engine;
pub mod selection;
pub mod spatial;
pub mod terrain;

pub use cancel::CancelToken;
pub use candidates::generate_route_candidates;
pub use error::SearchError;
pub use models::{
    Coordinate, DemData, LandcoverClass, LandcoverData, Obstacle, PaceEstimate, RoadNetwork,
    RouteCandidate, RouteRisk, RouteStep, SelectionConstraints, SelectionResult, StepKind,
    TerrainBundle, TerrainSource, TravelMode,
};
pub use selection::{select_route, UnsatisfiableConstraints};
