//! Terrain bundle loading and validation.
//!
//! A bundle is a directory named after its id holding four files: the two
//! JSON grids plus road and obstacle feature collections. Feature geometry
//! (road lines and obstacle rings) is stored (lon, lat) on disk; it is
//! swapped here, once, and never again downstream.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use overland_core::models::{
    Coordinate, DemData, GridMetadata, LandcoverClass, LandcoverData, Obstacle, RoadNetwork,
    TerrainBundle, TerrainSource,
};

use crate::error::EngineError;

pub const DEM_FILE: &str = "dem.json";
pub const LANDCOVER_FILE: &str = "landcover.json";
pub const ROADS_FILE: &str = "roads.geojson";
pub const OBSTACLES_FILE: &str = "obstacles.geojson";

const REQUIRED_FILES: [&str; 4] = [DEM_FILE, LANDCOVER_FILE, ROADS_FILE, OBSTACLES_FILE];

/// Parse an ISO-8601 timestamp; trailing `Z`, explicit offsets, and naive
/// values are all accepted, normalized to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, EngineError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    Err(EngineError::InvalidTimestamp(value.to_string()))
}

// ========== RAW ON-DISK SCHEMAS ==========

#[derive(Debug, Deserialize)]
struct RawOrigin {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    origin: RawOrigin,
    cell_size_m: f64,
    ttl_hours: i64,
    last_updated: String,
}

#[derive(Debug, Deserialize)]
struct RawDem {
    metadata: RawMetadata,
    grid: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    cost_factor: f64,
    exposure: f64,
    speed_modifier: f64,
}

#[derive(Debug, Deserialize)]
struct RawLandcover {
    metadata: RawMetadata,
    classes: HashMap<String, RawClass>,
    grid: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawRoadCollection {
    features: Vec<RawRoadFeature>,
}

#[derive(Debug, Deserialize)]
struct RawRoadFeature {
    geometry: LineGeometry,
    properties: RoadProps,
}

#[derive(Debug, Deserialize)]
struct RawObstacleCollection {
    features: Vec<RawObstacleFeature>,
}

#[derive(Debug, Deserialize)]
struct RawObstacleFeature {
    geometry: PolygonGeometry,
    #[serde(default)]
    properties: ObstacleProps,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct PolygonGeometry {
    coordinates: Vec<Vec<[f64; 2]>>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| EngineError::Corrupt {
        file: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn corrupt(path: &Path, reason: impl Into<String>) -> EngineError {
    EngineError::Corrupt {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

fn metadata_from_raw(raw: RawMetadata) -> Result<GridMetadata, EngineError> {
    Ok(GridMetadata {
        origin: Coordinate::new(raw.origin.lat, raw.origin.lon),
        cell_size_m: raw.cell_size_m,
        ttl_hours: raw.ttl_hours,
        last_updated: parse_timestamp(&raw.last_updated)?,
    })
}

fn check_rectangular<T>(grid: &[Vec<T>], path: &Path) -> Result<(), EngineError> {
    let Some(width) = grid.first().map(|row| row.len()) else {
        return Err(corrupt(path, "grid has no rows"));
    };
    if width == 0 {
        return Err(corrupt(path, "grid rows are empty"));
    }
    for (idx, row) in grid.iter().enumerate() {
        if row.len() != width {
            return Err(corrupt(
                path,
                format!("grid row {idx} has width {} (expected {width})", row.len()),
            ));
        }
    }
    Ok(())
}

pub fn load_dem(path: &Path) -> Result<DemData, EngineError> {
    let raw: RawDem = read_json(path)?;
    check_rectangular(&raw.grid, path)?;
    Ok(DemData {
        grid: raw.grid,
        metadata: metadata_from_raw(raw.metadata)?,
    })
}

pub fn load_landcover(path: &Path) -> Result<LandcoverData, EngineError> {
    let raw: RawLandcover = read_json(path)?;
    check_rectangular(&raw.grid, path)?;

    let classes: HashMap<String, LandcoverClass> = raw
        .classes
        .into_iter()
        .map(|(name, class)| {
            let entry = LandcoverClass {
                name: name.clone(),
                cost_factor: class.cost_factor,
                exposure: class.exposure,
                speed_modifier: class.speed_modifier,
            };
            (name, entry)
        })
        .collect();

    for row in &raw.grid {
        for label in row {
            if !classes.contains_key(label) {
                return Err(corrupt(
                    path,
                    format!("landcover class '{label}' referenced by the grid is not in the class table"),
                ));
            }
        }
    }

    Ok(LandcoverData {
        grid: raw.grid,
        classes,
        metadata: metadata_from_raw(raw.metadata)?,
    })
}

#[derive(Debug, Deserialize)]
struct RoadProps {
    id: serde_json::Value,
}

/// Road lines are stored (lon, lat); swap to engine order on the way in.
pub fn load_roads(path: &Path) -> Result<RoadNetwork, EngineError> {
    let raw: RawRoadCollection = read_json(path)?;
    let mut network = RoadNetwork::new();
    for feature in raw.features {
        let id = match feature.properties.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let coords = feature
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| Coordinate::new(lat, lon))
            .collect();
        network.insert(id, coords);
    }
    Ok(network)
}

#[derive(Debug, Default, Deserialize)]
struct ObstacleProps {
    #[serde(rename = "type")]
    kind: Option<String>,
    buffer_m: Option<f64>,
}

/// Obstacle rings are stored (lon, lat) like the road lines; swap to engine
/// order on the way in.
pub fn load_obstacles(path: &Path) -> Result<Vec<Obstacle>, EngineError> {
    let raw: RawObstacleCollection = read_json(path)?;
    let mut obstacles = Vec::new();
    for feature in raw.features {
        let Some(ring) = feature.geometry.coordinates.into_iter().next() else {
            continue;
        };
        obstacles.push(Obstacle {
            polygon: ring
                .into_iter()
                .map(|[lon, lat]| Coordinate::new(lat, lon))
                .collect(),
            kind: feature
                .properties
                .kind
                .unwrap_or_else(|| "obstacle".to_string()),
            buffer_m: feature.properties.buffer_m.unwrap_or(0.0),
        });
    }
    Ok(obstacles)
}

fn missing_files(dir: &Path) -> Vec<&'static str> {
    REQUIRED_FILES
        .iter()
        .copied()
        .filter(|file| !dir.join(file).exists())
        .collect()
}

/// Load a bundle directory into the terrain model.
pub fn load_bundle(data_root: &Path, id: &str) -> Result<TerrainBundle, EngineError> {
    let dir = data_root.join(id);
    if !dir.is_dir() {
        return Err(EngineError::BundleNotFound(id.to_string()));
    }
    if let Some(file) = missing_files(&dir).first() {
        return Err(EngineError::MissingBundleFile {
            bundle: id.to_string(),
            file: file.to_string(),
        });
    }

    let dem = load_dem(&dir.join(DEM_FILE))?;
    let landcover = load_landcover(&dir.join(LANDCOVER_FILE))?;
    let roads = load_roads(&dir.join(ROADS_FILE))?;
    let obstacles = load_obstacles(&dir.join(OBSTACLES_FILE))?;

    let dem_path = dir.join(DEM_FILE);
    if dem.height() != landcover.grid.len()
        || dem.width() != landcover.grid.first().map(|r| r.len()).unwrap_or(0)
    {
        return Err(corrupt(&dem_path, "DEM and landcover dimensions differ"));
    }
    if dem.metadata.origin != landcover.metadata.origin
        || dem.metadata.cell_size_m != landcover.metadata.cell_size_m
    {
        return Err(corrupt(&dem_path, "DEM and landcover origin or cell size differ"));
    }

    tracing::info!(
        bundle = id,
        rows = dem.height(),
        cols = dem.width(),
        roads = roads.len(),
        obstacles = obstacles.len(),
        "terrain bundle loaded"
    );

    Ok(TerrainBundle {
        id: id.to_string(),
        dem,
        landcover,
        obstacles,
        roads,
        source: TerrainSource::Survey,
    })
}

/// Validate a freshly materialized bundle directory (e.g. just extracted by
/// the host). A partially written directory is removed before the error
/// surfaces so a retry starts clean.
pub fn register_bundle(data_root: &Path, id: &str) -> Result<TerrainBundle, EngineError> {
    let dir = data_root.join(id);
    if !dir.is_dir() {
        return Err(EngineError::BundleNotFound(id.to_string()));
    }
    let missing = missing_files(&dir);
    if let Some(file) = missing.first() {
        tracing::warn!(bundle = id, missing = ?missing, "removing incomplete bundle directory");
        fs::remove_dir_all(&dir)?;
        return Err(EngineError::MissingBundleFile {
            bundle: id.to_string(),
            file: file.to_string(),
        });
    }
    load_bundle(data_root, id)
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Enumerate the complete bundles under the data root.
pub fn list_bundles(data_root: &Path) -> Result<Vec<BundleInfo>, EngineError> {
    let mut bundles = Vec::new();
    if !data_root.is_dir() {
        return Ok(bundles);
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(data_root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    for dir in dirs {
        if !missing_files(&dir).is_empty() {
            continue;
        }
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        bundles.push(BundleInfo {
            name: title_case(&id.replace('_', " ")),
            description: format!("Terrain bundle: {id}"),
            id,
        });
    }
    Ok(bundles)
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceStatus {
    pub dataset: String,
    pub expired: bool,
    pub expires_at: DateTime<Utc>,
}

/// TTL status for the bundle's grid datasets.
pub fn provenance_status(bundle: &TerrainBundle, now: DateTime<Utc>) -> Vec<ProvenanceStatus> {
    [
        ("dem", &bundle.dem.metadata),
        ("landcover", &bundle.landcover.metadata),
    ]
    .into_iter()
    .map(|(dataset, meta)| ProvenanceStatus {
        dataset: dataset.to_string(),
        expired: meta.is_expired(now),
        expires_at: meta.expires_at(),
    })
    .collect()
}
