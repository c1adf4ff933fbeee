//! Transportable artifact export.
//!
//! Writes three files sharing a sanitized basename into the exports root:
//! a GeoJSON LineString of the selected route, a GPX 1.1 track with named
//! waypoints at every checkpoint, and a Markdown mission brief. Each file is
//! paired with its SHA-256 digest in the returned payload.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use overland_core::models::{RouteCandidate, SelectionResult, StepKind};

use crate::error::EngineError;

#[derive(Debug, Clone, Serialize)]
pub struct ExportFile {
    pub path: String,
    pub checksum_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportFiles {
    pub geojson: ExportFile,
    pub gpx: ExportFile,
    pub brief: ExportFile,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifacts {
    pub export_root: String,
    pub basename: String,
    pub waypoints_in_gpx: bool,
    pub files: ExportFiles,
}

/// Collapse anything outside `[A-Za-z0-9_-]` into single dashes; fall back
/// to the route id when nothing survives.
fn sanitize_basename(candidate: &str, fallback: &str) -> String {
    let mut cleaned = String::new();
    let mut pending_dash = false;
    for ch in candidate.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            if pending_dash && !cleaned.is_empty() {
                cleaned.push('-');
            }
            pending_dash = false;
            cleaned.push(ch);
        } else {
            pending_dash = true;
        }
    }
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '_');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

fn geojson_feature(route: &RouteCandidate) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = route
        .steps
        .iter()
        .map(|step| [step.coordinate.lat, step.coordinate.lon])
        .collect();
    json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": coordinates,
        },
        "properties": {
            "id": route.id,
            "distance_m": route.distance_m,
            "ascent_m": route.ascent_m,
            "descent_m": route.descent_m,
            "cost": route.estimated_cost,
        },
    })
}

fn write_geojson(route: &RouteCandidate, path: &Path) -> Result<(), EngineError> {
    let collection = json!({
        "type": "FeatureCollection",
        "features": [geojson_feature(route)],
    });
    let body = serde_json::to_string_pretty(&collection)
        .map_err(|err| EngineError::External(err.to_string()))?;
    fs::write(path, body)?;
    Ok(())
}

fn write_gpx(route: &RouteCandidate, path: &Path) -> Result<(), EngineError> {
    let mut waypoints = String::new();
    let mut segments = String::new();
    for step in &route.steps {
        let _ = writeln!(
            segments,
            "      <trkpt lat=\"{}\" lon=\"{}\"><ele>{}</ele></trkpt>",
            step.coordinate.lat, step.coordinate.lon, step.elevation
        );
        if step.kind == StepKind::Checkpoint {
            if let Some(label) = &step.label {
                let _ = writeln!(
                    waypoints,
                    "  <wpt lat=\"{}\" lon=\"{}\"><name>{}</name><desc>{} {} km</desc></wpt>",
                    step.coordinate.lat,
                    step.coordinate.lon,
                    label,
                    step.terrain,
                    step.km_marker
                );
            }
        }
    }

    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <gpx version=\"1.1\" creator=\"overland\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n\
         {waypoints}  <trk>\n    <name>{name}</name>\n    <trkseg>\n{segments}    </trkseg>\n  </trk>\n</gpx>\n",
        name = route.id,
    );
    fs::write(path, xml)?;
    Ok(())
}

fn write_brief(
    result: &SelectionResult,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let route = &result.selected_route;
    let pace = &result.pace;
    let risk = &result.risk;

    let segment_steps: Vec<_> = route
        .steps
        .iter()
        .filter(|step| step.kind == StepKind::Segment)
        .collect();
    let stride = if segment_steps.is_empty() {
        1
    } else {
        (segment_steps.len() / 6).max(1)
    };

    let mut lines = vec![
        format!("# Mission Brief: {}", route.id),
        String::new(),
        format!("_Generated {}_", now.format("%Y-%m-%d %H:%MZ")),
        String::new(),
        "## Summary".to_string(),
        format!("- Total distance: {:.2} km", route.distance_m / 1000.0),
        format!("- Elevation gain: {:.1} m", route.ascent_m),
        format!("- Elevation loss: {:.1} m", route.descent_m),
        format!(
            "- ETA: {:.1} min ({}, load {} kg)",
            pace.travel_time_minutes, pace.mode, pace.load_kg
        ),
        String::new(),
        "## Risk Assessment".to_string(),
        format!("- Aggregate risk: {:.2}", risk.aggregate()),
        format!("- Slope risk: {:.2}", risk.slope_risk),
        format!("- Exposure risk: {:.2}", risk.exposure_risk),
        format!("- Hydrology risk: {:.2}", risk.hydrology_risk),
        format!(
            "- Weights: slope {:.2}, exposure {:.2}, hydrology {:.2}",
            risk.weights.slope, risk.weights.exposure, risk.weights.hydrology
        ),
        format!(
            "- Hydrology check: {} crossings, nearest water {}",
            risk.hydrology_check.crossings,
            risk.hydrology_check
                .nearest_water_m
                .map(|d| format!("{d} m"))
                .unwrap_or_else(|| "n/a".to_string())
        ),
        String::new(),
        "## Key Checkpoints".to_string(),
    ];

    for (idx, step) in segment_steps.iter().step_by(stride).take(6).enumerate() {
        let label = step
            .label
            .clone()
            .unwrap_or_else(|| format!("CP{}", idx + 1));
        lines.push(format!(
            "- {label}: {:.5}, {:.5} via {}",
            step.coordinate.lat, step.coordinate.lon, step.terrain
        ));
    }

    lines.push(String::new());
    lines.push("## Caveats".to_string());
    lines.push(format!("- {}", result.rationale));

    fs::write(path, lines.join("\n"))?;
    Ok(())
}

fn checksum_sha256(path: &Path) -> Result<String, EngineError> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

/// Report paths relative to the exports root's parent when possible.
fn relative_path(path: &Path, export_root: &Path) -> String {
    let base: &Path = export_root.parent().unwrap_or(export_root);
    path.strip_prefix(base)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

fn export_file(path: PathBuf, export_root: &Path) -> Result<ExportFile, EngineError> {
    Ok(ExportFile {
        checksum_sha256: checksum_sha256(&path)?,
        path: relative_path(&path, export_root),
    })
}

/// Write all three artifacts for the selected route.
pub fn export_all(
    result: &SelectionResult,
    export_root: &Path,
    basename: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ExportArtifacts, EngineError> {
    fs::create_dir_all(export_root)?;

    let route_id = &result.selected_route.id;
    let base = sanitize_basename(basename.unwrap_or(route_id), route_id);

    let geojson_path = export_root.join(format!("{base}.geojson"));
    let gpx_path = export_root.join(format!("{base}.gpx"));
    let brief_path = export_root.join(format!("{base}_brief.md"));

    write_geojson(&result.selected_route, &geojson_path)?;
    write_gpx(&result.selected_route, &gpx_path)?;
    write_brief(result, &brief_path, now)?;

    tracing::info!(basename = %base, root = %export_root.display(), "route artifacts exported");

    Ok(ExportArtifacts {
        export_root: relative_path(export_root, export_root),
        basename: base,
        waypoints_in_gpx: true,
        files: ExportFiles {
            geojson: export_file(geojson_path, export_root)?,
            gpx: export_file(gpx_path, export_root)?,
            brief: export_file(brief_path, export_root)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_basenames() {
        assert_eq!(sanitize_basename("patrol alpha", "route-1"), "patrol-alpha");
        assert_eq!(sanitize_basename("  op/7: dawn  ", "route-1"), "op-7-dawn");
        assert_eq!(sanitize_basename("___", "route-1"), "route-1");
        assert_eq!(sanitize_basename("", "route-1"), "route-1");
        assert_eq!(sanitize_basename("already_ok-42", "route-1"), "already_ok-42");
    }
}
