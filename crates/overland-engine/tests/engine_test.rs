//! End-to-end engine façade tests: generate, risk, pace, select, export.

mod common;

use chrono::Utc;
use overland_core::models::{Coordinate, SelectionConstraints, StepKind, TravelMode};
use overland_engine::error::ErrorKind;
use overland_engine::{
    bundle_from_road_source, load_bundle, EngineError, HighwayWay, RoutePlanner,
};
use sha2::{Digest, Sha256};
use std::fs;
use tempfile::TempDir;

fn sample_planner(root: &TempDir) -> RoutePlanner {
    common::write_sample_bundle(root.path());
    let bundle = load_bundle(root.path(), common::SAMPLE_BUNDLE).unwrap();
    RoutePlanner::new(bundle)
}

const START: Coordinate = Coordinate { lat: 34.0, lon: -117.0 };
// Grid cell (4, 4) of the sample bundle.
const END: Coordinate = Coordinate { lat: 34.003593, lon: -116.995294 };

#[test]
fn full_pipeline_over_grid_bundle() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);

    let generated = planner.generate_routes(START, END, 3).unwrap();
    assert_eq!(generated.routes.len(), 3);
    let ids: Vec<String> = generated.routes.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec!["route-1", "route-2", "route-3"]);
    assert_eq!(generated.crs.order, "lat,lon");
    assert_eq!(generated.provenance.ttl_status.len(), 2);
    for route in &generated.routes {
        assert_eq!(route.provenance.sequence_id.as_deref(), Some(route.id.as_str()));
        assert!(!route.steps.is_empty());
    }

    let risks = planner.evaluate_risk(Some(&ids)).unwrap();
    assert_eq!(risks.risks.len(), 3);
    for entry in &risks.risks {
        for value in [entry.slope, entry.exposure, entry.hydrology, entry.aggregate] {
            assert!((0.0..=1.0).contains(&value));
        }
    }
    // Risk evaluation stamps each candidate's composite.
    for id in &ids {
        assert!(planner.state().routes[id].composite.is_some());
    }

    let paces = planner.estimate_pace(TravelMode::Foot, 25.0, Some(&ids)).unwrap();
    assert_eq!(paces.pace_estimates.len(), 3);
    for pace in &paces.pace_estimates {
        assert!(pace.travel_time_minutes > 0.0);
        assert!(pace.base_speed_kmh >= 1.5);
    }

    let selection = planner
        .select(Some(&ids), SelectionConstraints::default())
        .unwrap();
    // Balanced carries the cheapest composite over uniform open terrain.
    assert_eq!(selection.selection.route.id, "route-1");
    assert_eq!(selection.selection.alternates.len(), 2);
    assert!(selection.selection.rationale.contains("route-1 selected"));

    let export_root = root.path().join("exports");
    let exports = planner.export(Some("patrol alpha"), &export_root).unwrap();
    assert_eq!(exports.artifacts.basename, "patrol-alpha");
    assert!(exports.artifacts.waypoints_in_gpx);

    // Digests match the bytes on disk.
    for file in [
        &exports.artifacts.files.geojson,
        &exports.artifacts.files.gpx,
        &exports.artifacts.files.brief,
    ] {
        let path = root.path().join(&file.path);
        let bytes = fs::read(&path).unwrap();
        let digest = Sha256::digest(&bytes);
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, file.checksum_sha256);
    }

    // The LineString mirrors the step sequence, (lat, lon) order.
    let geojson: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.path().join(&exports.artifacts.files.geojson.path)).unwrap(),
    )
    .unwrap();
    let coords = geojson["features"][0]["geometry"]["coordinates"]
        .as_array()
        .unwrap();
    let selected = &planner.state().routes["route-1"];
    assert_eq!(coords.len(), selected.steps.len());
    for (coord, step) in coords.iter().zip(&selected.steps) {
        assert_eq!(coord[0].as_f64().unwrap(), step.coordinate.lat);
        assert_eq!(coord[1].as_f64().unwrap(), step.coordinate.lon);
    }

    // Every checkpoint becomes a named GPX waypoint.
    let gpx = fs::read_to_string(root.path().join(&exports.artifacts.files.gpx.path)).unwrap();
    let checkpoints = selected
        .steps
        .iter()
        .filter(|s| s.kind == StepKind::Checkpoint)
        .count();
    assert!(checkpoints > 0);
    assert_eq!(gpx.matches("<wpt ").count(), checkpoints);

    let brief = fs::read_to_string(root.path().join(&exports.artifacts.files.brief.path)).unwrap();
    assert!(brief.starts_with("# Mission Brief: route-1"));
    assert!(brief.contains("## Risk Assessment"));
}

#[test]
fn descriptors_are_identical_across_operations() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);

    let generated = planner.generate_routes(START, END, 2).unwrap();
    let risks = planner.evaluate_risk(None).unwrap();
    let paces = planner.estimate_pace(TravelMode::Wheeled, 10.0, None).unwrap();

    let g = serde_json::to_value(&generated).unwrap();
    let r = serde_json::to_value(&risks).unwrap();
    let p = serde_json::to_value(&paces).unwrap();
    assert_eq!(g["handling"], r["handling"]);
    assert_eq!(r["handling"], p["handling"]);
    assert_eq!(g["schema"], r["schema"]);
    assert_eq!(r["schema"], p["schema"]);
    assert_eq!(g["handling"]["sensitivity"], "UNCLASSIFIED");
    assert_eq!(g["handling"]["ttl_hours"], 720);
    assert_eq!(g["schema"]["version"], "1.2.0");
}

#[test]
fn unknown_route_ids_fail_loudly() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);
    planner.generate_routes(START, END, 1).unwrap();

    let bogus = vec!["route-99".to_string()];
    let err = planner.evaluate_risk(Some(&bogus)).unwrap_err();
    assert!(matches!(err, EngineError::UnknownRoutes(ref ids) if ids == "route-99"));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = planner
        .estimate_pace(TravelMode::Foot, 25.0, Some(&bogus))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownRoutes(_)));
}

#[test]
fn prerequisites_are_enforced_in_order() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);
    planner.generate_routes(START, END, 1).unwrap();

    // Selecting before risk evaluation.
    let err = planner
        .select(None, SelectionConstraints::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingRisk(_)));

    planner.evaluate_risk(None).unwrap();
    let err = planner
        .select(None, SelectionConstraints::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingPace(_)));

    // Exporting before selection.
    let err = planner
        .export(None, &root.path().join("exports"))
        .unwrap_err();
    assert!(matches!(err, EngineError::NoSelection));
}

#[test]
fn route_counter_is_never_reset() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);

    let first = planner.generate_routes(START, END, 3).unwrap();
    assert_eq!(first.routes[0].id, "route-1");

    let second = planner.generate_routes(START, END, 3).unwrap();
    let ids: Vec<&str> = second.routes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["route-4", "route-5", "route-6"]);

    // Prior generation's ids are gone from state.
    let stale = vec!["route-1".to_string()];
    assert!(matches!(
        planner.evaluate_risk(Some(&stale)),
        Err(EngineError::UnknownRoutes(_))
    ));
}

#[test]
fn unsatisfiable_constraints_surface_as_error() {
    let root = TempDir::new().unwrap();
    let mut planner = sample_planner(&root);
    planner.generate_routes(START, END, 2).unwrap();
    planner.evaluate_risk(None).unwrap();
    planner.estimate_pace(TravelMode::Foot, 25.0, None).unwrap();

    let constraints = SelectionConstraints {
        max_distance_m: Some(1.0),
        ..SelectionConstraints::default()
    };
    let err = planner.select(None, constraints).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsatisfiable);
}

#[test]
fn road_only_pipeline_uses_dijkstra() {
    let ways = vec![HighwayWay {
        id: 101,
        highway: "track".to_string(),
        name: None,
        points: (0..6)
            .map(|i| [-117.0 + 0.002 * i as f64, 34.0 + 0.002 * i as f64])
            .collect(),
    }];
    let bundle = bundle_from_road_source("osm_import", &ways, &[], Utc::now());
    let mut planner = RoutePlanner::new(bundle);

    let generated = planner
        .generate_routes(
            Coordinate::new(34.0001, -116.9999),
            Coordinate::new(34.0095, -116.9905),
            3,
        )
        .unwrap();
    assert_eq!(generated.routes.len(), 3);
    assert_eq!(
        generated.routes[0].provenance.algorithm.as_deref(),
        Some("road_network_dijkstra")
    );
    assert_eq!(generated.routes[1].constraints_used.variant, Some(2));

    let ids: Vec<String> = generated.routes.iter().map(|r| r.id.clone()).collect();
    planner.evaluate_risk(Some(&ids)).unwrap();
    planner
        .estimate_pace(TravelMode::Wheeled, 10.0, Some(&ids))
        .unwrap();
    let selection = planner
        .select(Some(&ids), SelectionConstraints::default())
        .unwrap();
    // Variants only scale the cost up, so the base route wins.
    assert_eq!(selection.selection.route.id, "route-1");
}
