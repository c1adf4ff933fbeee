//! Bundle loader integration tests.

mod common;

use chrono::{TimeZone, Utc};
use overland_core::models::Coordinate;
use overland_engine::error::ErrorKind;
use overland_engine::{list_bundles, load_bundle, parse_timestamp, register_bundle, EngineError};
use std::fs;
use tempfile::TempDir;

#[test]
fn loads_a_complete_bundle() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());

    let bundle = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap();
    assert_eq!(bundle.id, "sample_area");
    assert_eq!(bundle.dem.height(), 12);
    assert_eq!(bundle.dem.width(), 12);
    assert_eq!(
        bundle.dem.metadata.last_updated,
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    );
    assert!(!bundle.is_road_only());

    // Road geometry was (lon, lat) on disk; in memory it is (lat, lon).
    let road = &bundle.roads["service-7"];
    assert_eq!(road[0], Coordinate::new(33.99, -117.02));

    // Obstacle rings get the same swap.
    assert_eq!(bundle.obstacles.len(), 1);
    let obstacle = &bundle.obstacles[0];
    assert_eq!(obstacle.polygon[0], Coordinate::new(33.985, -117.02));
    assert_eq!(obstacle.polygon[2], Coordinate::new(33.987, -117.018));
    assert_eq!(obstacle.kind, "building");
    assert_eq!(obstacle.buffer_m, 10.0);
}

#[test]
fn missing_directory_is_not_found() {
    let root = TempDir::new().unwrap();
    let err = load_bundle(root.path(), "nowhere").unwrap_err();
    assert!(matches!(err, EngineError::BundleNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn missing_member_is_reported_without_deleting() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let dir = root.path().join(common::SAMPLE_BUNDLE);
    fs::remove_file(dir.join("roads.geojson")).unwrap();

    let err = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap_err();
    match err {
        EngineError::MissingBundleFile { file, .. } => assert_eq!(file, "roads.geojson"),
        other => panic!("unexpected error: {other}"),
    }
    // Plain loads never remove user data.
    assert!(dir.exists());
}

#[test]
fn register_removes_partial_directories() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let dir = root.path().join(common::SAMPLE_BUNDLE);
    fs::remove_file(dir.join("landcover.json")).unwrap();

    let err = register_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!dir.exists(), "partial bundle directory should be removed");
}

#[test]
fn ragged_grid_is_corruption() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let dem_path = root.path().join(common::SAMPLE_BUNDLE).join("dem.json");
    let mut dem: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dem_path).unwrap()).unwrap();
    dem["grid"][3] = serde_json::json!([100.0, 100.0]);
    fs::write(&dem_path, serde_json::to_string(&dem).unwrap()).unwrap();

    let err = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
}

#[test]
fn unknown_landcover_class_is_corruption() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let lc_path = root.path().join(common::SAMPLE_BUNDLE).join("landcover.json");
    let mut lc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&lc_path).unwrap()).unwrap();
    lc["grid"][0][0] = serde_json::json!("lava");
    fs::write(&lc_path, serde_json::to_string(&lc).unwrap()).unwrap();

    let err = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
    assert!(err.to_string().contains("lava"));
}

#[test]
fn mismatched_grid_dimensions_are_corruption() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let lc_path = root.path().join(common::SAMPLE_BUNDLE).join("landcover.json");
    let mut lc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&lc_path).unwrap()).unwrap();
    lc["grid"] = serde_json::json!(vec![vec!["open"; 4]; 4]);
    fs::write(&lc_path, serde_json::to_string(&lc).unwrap()).unwrap();

    let err = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
}

#[test]
fn timestamps_parse_flexibly() {
    let expected = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
    assert_eq!(parse_timestamp("2025-06-01T12:30:00Z").unwrap(), expected);
    assert_eq!(parse_timestamp("2025-06-01T12:30:00+00:00").unwrap(), expected);
    assert_eq!(
        parse_timestamp("2025-06-01T14:30:00+02:00").unwrap(),
        expected
    );
    assert_eq!(parse_timestamp("2025-06-01T12:30:00").unwrap(), expected);
    assert!(matches!(
        parse_timestamp("last tuesday"),
        Err(EngineError::InvalidTimestamp(_))
    ));
}

#[test]
fn list_bundles_skips_incomplete_directories() {
    let root = TempDir::new().unwrap();
    common::write_sample_bundle(root.path());
    let partial = root.path().join("half_done");
    fs::create_dir_all(&partial).unwrap();
    fs::write(partial.join("dem.json"), "{}").unwrap();

    let bundles = list_bundles(root.path()).unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].id, "sample_area");
    assert_eq!(bundles[0].name, "Sample Area");
}
