//! Overland Engine - stateful route-planning façade
//!
//! Loads terrain bundles from disk (or synthesizes them from a road-only
//! source), drives the overland-core planners, and exports transportable
//! artifacts. All I/O is synchronous; hosts wrapping the engine in an async
//! pipeline dispatch these calls onto a worker.

pub mod config;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod roadsource;

pub use config::Config;
pub use engine::{EngineState, RoutePlanner, CRS, HANDLING, SCHEMA};
pub use error::{EngineError, ErrorKind};
pub use loader::{list_bundles, load_bundle, parse_timestamp, register_bundle};
pub use roadsource::{bundle_from_road_source, AreaFeature, AreaKind, HighwayWay};
