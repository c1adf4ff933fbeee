//! overland - plan a ground route end to end and print the result as JSON.
//!
//! Runs the full pipeline against a terrain bundle: generate candidates,
//! evaluate risk, estimate pace, select under constraints, export artifacts.
//! Log output goes to stderr so stdout stays machine-readable.

use anyhow::{Context, Result};
use clap::Parser;
use overland_core::models::{Coordinate, SelectionConstraints, TravelMode};
use overland_engine::{load_bundle, parse_timestamp, Config, RoutePlanner};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "overland", version, about = "Mission ground-route planning")]
struct Args {
    /// Start coordinate
    #[arg(long, num_args = 2, value_names = ["LAT", "LON"], allow_negative_numbers = true, required = true)]
    start: Vec<f64>,

    /// End coordinate
    #[arg(long, num_args = 2, value_names = ["LAT", "LON"], allow_negative_numbers = true, required = true)]
    end: Vec<f64>,

    /// Terrain bundle id under the data root
    #[arg(long, default_value = "sample_area")]
    bundle: String,

    /// Movement mode: foot or wheeled
    #[arg(long, default_value = "foot")]
    mode: TravelMode,

    /// Carried load in kilograms
    #[arg(long = "load-kg", default_value_t = 25.0)]
    load_kg: f64,

    #[arg(long = "max-candidates", default_value_t = 3)]
    max_candidates: usize,

    /// Hard arrival deadline, ISO-8601
    #[arg(long = "must-arrive-before")]
    must_arrive_before: Option<String>,

    /// Reject routes whose steepest step exceeds this many degrees
    #[arg(long = "avoid-slope")]
    avoid_slope: Option<f64>,

    /// Reject routes longer than this many meters
    #[arg(long = "max-distance")]
    max_distance: Option<f64>,

    /// Basename for exported files (defaults to the selected route id)
    #[arg(long = "export-name")]
    export_name: Option<String>,

    /// Prefer the lowest aggregate risk when scoring (default)
    #[arg(long = "prefer-low-risk", overrides_with = "no_prefer_low_risk")]
    prefer_low_risk: bool,

    /// Disable preference for lowest aggregate risk
    #[arg(long = "no-prefer-low-risk")]
    no_prefer_low_risk: bool,

    /// Override the terrain data root (OVERLAND_DATA_ROOT)
    #[arg(long = "data-root")]
    data_root: Option<PathBuf>,

    /// Override the exports root (OVERLAND_EXPORT_ROOT)
    #[arg(long = "export-root")]
    export_root: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(root) = args.data_root {
        config.data_root = root;
    }
    if let Some(root) = args.export_root {
        config.export_root = root;
    }

    let start = Coordinate::new(args.start[0], args.start[1]);
    let end = Coordinate::new(args.end[0], args.end[1]);
    let must_arrive_before = args
        .must_arrive_before
        .as_deref()
        .map(parse_timestamp)
        .transpose()
        .context("invalid --must-arrive-before")?;
    let prefer_low_risk = args.prefer_low_risk || !args.no_prefer_low_risk;

    let bundle = load_bundle(&config.data_root, &args.bundle)?;
    let mut planner = RoutePlanner::new(bundle);

    let mut routes = planner.generate_routes(start, end, args.max_candidates)?;
    let ids: Vec<String> = routes.routes.iter().map(|r| r.id.clone()).collect();

    let risks = planner.evaluate_risk(Some(&ids))?;
    let pace = planner.estimate_pace(args.mode, args.load_kg, Some(&ids))?;

    let constraints = SelectionConstraints {
        must_arrive_before,
        avoid_slope_degrees: args.avoid_slope,
        prefer_low_risk,
        max_distance_m: args.max_distance,
    };
    let selection = planner.select(Some(&ids), constraints)?;
    let exports = planner.export(args.export_name.as_deref(), &config.export_root)?;

    // Mirror the post-risk composites back into the generation listing.
    for entry in &mut routes.routes {
        entry.composite = planner
            .state()
            .routes
            .get(&entry.id)
            .and_then(|route| route.composite);
    }

    let output = json!({
        "routes": routes,
        "risks": risks,
        "pace": pace,
        "selection": selection,
        "exports": exports,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
