//! Road-only terrain ingestion.
//!
//! Consumes post-parsed features from an OSM-like source (the byte-level
//! parser is an external collaborator) and synthesizes a terrain bundle:
//! the real road network plus placeholder grids, flagged `RoadOnly` so the
//! candidate generator routes over the graph instead of the grids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use overland_core::models::{
    Coordinate, DemData, GridMetadata, LandcoverClass, LandcoverData, Obstacle, RoadNetwork,
    TerrainBundle, TerrainSource,
};

/// A highway way from the parsed source; coordinates in (lon, lat) order as
/// imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighwayWay {
    pub id: i64,
    pub highway: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaKind {
    Building,
    Water,
    Military,
}

impl AreaKind {
    fn as_str(&self) -> &'static str {
        match self {
            AreaKind::Building => "building",
            AreaKind::Water => "water",
            AreaKind::Military => "military",
        }
    }
}

/// An area feature tagged building / water / military; outer ring in
/// (lon, lat) order as imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaFeature {
    pub id: i64,
    pub kind: AreaKind,
    pub ring: Vec<[f64; 2]>,
}

const PLACEHOLDER_ORIGIN: Coordinate = Coordinate {
    lat: 34.0,
    lon: -117.0,
};
const PLACEHOLDER_SIZE: usize = 10;
const PLACEHOLDER_CELL_M: f64 = 100.0;
const PLACEHOLDER_ELEVATION_M: f64 = 100.0;
const PLACEHOLDER_TTL_HOURS: i64 = 720;

fn placeholder_metadata(now: DateTime<Utc>) -> GridMetadata {
    GridMetadata {
        origin: PLACEHOLDER_ORIGIN,
        cell_size_m: PLACEHOLDER_CELL_M,
        ttl_hours: PLACEHOLDER_TTL_HOURS,
        last_updated: now,
    }
}

/// 10x10 flat-elevation DEM standing in for missing survey data.
pub fn placeholder_dem(now: DateTime<Utc>) -> DemData {
    DemData {
        grid: vec![vec![PLACEHOLDER_ELEVATION_M; PLACEHOLDER_SIZE]; PLACEHOLDER_SIZE],
        metadata: placeholder_metadata(now),
    }
}

fn class(name: &str, cost_factor: f64, exposure: f64, speed_modifier: f64) -> LandcoverClass {
    LandcoverClass {
        name: name.to_string(),
        cost_factor,
        exposure,
        speed_modifier,
    }
}

/// All-"open" landcover grid carrying the standard five-class table.
pub fn placeholder_landcover(now: DateTime<Utc>) -> LandcoverData {
    let mut classes = HashMap::new();
    classes.insert("trail".to_string(), class("trail", 0.8, 0.2, 1.1));
    classes.insert("forest".to_string(), class("forest", 1.2, 0.4, 0.85));
    classes.insert("open".to_string(), class("open", 1.0, 0.6, 1.0));
    classes.insert("wetland".to_string(), class("wetland", 1.5, 0.5, 0.7));
    classes.insert("road".to_string(), class("road", 0.7, 0.3, 1.2));

    LandcoverData {
        grid: vec![vec!["open".to_string(); PLACEHOLDER_SIZE]; PLACEHOLDER_SIZE],
        classes,
        metadata: placeholder_metadata(now),
    }
}

/// Build a road-only bundle from post-parsed source features.
///
/// Ways shorter than two vertices are dropped. Obstacle extraction is
/// best-effort: degenerate rings are skipped and an empty set is fine.
pub fn bundle_from_road_source(
    id: &str,
    ways: &[HighwayWay],
    areas: &[AreaFeature],
    now: DateTime<Utc>,
) -> TerrainBundle {
    let mut roads = RoadNetwork::new();
    for way in ways {
        if way.points.len() < 2 {
            continue;
        }
        // Imported order is (lon, lat); normalize here, once.
        let coords = way
            .points
            .iter()
            .map(|&[lon, lat]| Coordinate::new(lat, lon))
            .collect();
        roads.insert(way.id.to_string(), coords);
    }

    let mut obstacles = Vec::new();
    let mut skipped = 0usize;
    for area in areas {
        if area.ring.len() < 3 {
            skipped += 1;
            continue;
        }
        obstacles.push(Obstacle {
            polygon: area
                .ring
                .iter()
                .map(|&[lon, lat]| Coordinate::new(lat, lon))
                .collect(),
            kind: area.kind.as_str().to_string(),
            buffer_m: 0.0,
        });
    }
    if skipped > 0 {
        tracing::warn!(skipped, "dropped degenerate obstacle rings from road source");
    }

    tracing::info!(
        bundle = id,
        roads = roads.len(),
        obstacles = obstacles.len(),
        "road-only bundle synthesized with placeholder grids"
    );

    TerrainBundle {
        id: id.to_string(),
        dem: placeholder_dem(now),
        landcover: placeholder_landcover(now),
        obstacles,
        roads,
        source: TerrainSource::RoadOnly,
    }
}
