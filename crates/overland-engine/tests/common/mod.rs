//! Shared fixtures for engine integration tests.

use std::fs;
use std::path::Path;

pub const SAMPLE_BUNDLE: &str = "sample_area";

/// Write a complete 12x12 all-open bundle under `data_root/sample_area`.
/// The grid is larger than the placeholder shape so the carried road does
/// not flip the bundle into road-only mode.
pub fn write_sample_bundle(data_root: &Path) {
    let dir = data_root.join(SAMPLE_BUNDLE);
    fs::create_dir_all(&dir).unwrap();

    let metadata = serde_json::json!({
        "origin": {"lat": 34.0, "lon": -117.0},
        "cell_size_m": 100,
        "ttl_hours": 720,
        "last_updated": "2025-06-01T00:00:00Z",
    });

    let dem = serde_json::json!({
        "metadata": metadata.clone(),
        "grid": vec![vec![100.0; 12]; 12],
    });
    fs::write(dir.join("dem.json"), serde_json::to_string_pretty(&dem).unwrap()).unwrap();

    let landcover = serde_json::json!({
        "metadata": metadata,
        "classes": {
            "open": {"cost_factor": 1.0, "exposure": 0.6, "speed_modifier": 1.0},
            "trail": {"cost_factor": 0.8, "exposure": 0.2, "speed_modifier": 1.1},
        },
        "grid": vec![vec!["open"; 12]; 12],
    });
    fs::write(
        dir.join("landcover.json"),
        serde_json::to_string_pretty(&landcover).unwrap(),
    )
    .unwrap();

    // Road coordinates on disk are (lon, lat).
    let roads = serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[-117.02, 33.99], [-117.02, 33.98]],
            },
            "properties": {"id": "service-7"},
        }],
    });
    fs::write(dir.join("roads.geojson"), serde_json::to_string(&roads).unwrap()).unwrap();

    // Obstacle rings are (lon, lat) on disk too. This one sits south of the
    // grid so routing tests are unaffected.
    let obstacles = serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [-117.02, 33.985],
                    [-117.018, 33.985],
                    [-117.018, 33.987],
                    [-117.02, 33.987],
                    [-117.02, 33.985],
                ]],
            },
            "properties": {"type": "building", "buffer_m": 10.0},
        }],
    });
    fs::write(
        dir.join("obstacles.geojson"),
        serde_json::to_string(&obstacles).unwrap(),
    )
    .unwrap();
}
