//! Constraint-driven route selection.
//!
//! Filters candidates against commander constraints, scores the survivors,
//! and reports every losing candidate as an alternate with categorical
//! reason codes. Selection is deterministic: score ties fall back to lower
//! estimated cost, then to larger trail coverage.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{
    Alternate, ConstraintsSummary, PaceEstimate, RouteCandidate, RouteRisk, SelectionConstraints,
    SelectionPolicy, SelectionResult,
};
use crate::spatial::round_to;

pub const SCORE_DEFINITION: &str = "composite score = estimated_cost * (1 + aggregate_risk) \
     when prefer_low_risk else estimated_cost";

/// No candidate survived the constraint filters.
#[derive(Debug, Error)]
#[error("no route satisfies the provided constraints: {rationale}")]
pub struct UnsatisfiableConstraints {
    pub rationale: String,
}

struct Evaluation<'a> {
    route: &'a RouteCandidate,
    risk: &'a RouteRisk,
    pace: &'a PaceEstimate,
    score: f64,
    rejected: Option<String>,
}

fn better(a: &Evaluation<'_>, b: &Evaluation<'_>) -> bool {
    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Less) => true,
        Some(Ordering::Greater) => false,
        _ => match a.route.estimated_cost.partial_cmp(&b.route.estimated_cost) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => a.route.trail_km() > b.route.trail_km(),
        },
    }
}

fn dominant_class(route: &RouteCandidate) -> Option<&str> {
    route
        .coverage
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(name, _)| name.as_str())
}

/// Select the best route under the given constraints.
///
/// `now` anchors the deadline filter so results are reproducible under test.
/// Routes missing a risk or pace entry are skipped; the engine validates
/// those prerequisites before calling in.
pub fn select_route(
    routes: &[&RouteCandidate],
    risks: &BTreeMap<String, RouteRisk>,
    paces: &BTreeMap<String, PaceEstimate>,
    constraints: &SelectionConstraints,
    now: DateTime<Utc>,
) -> Result<SelectionResult, UnsatisfiableConstraints> {
    let mut rationale_parts: Vec<String> = Vec::new();
    let mut evaluations: Vec<Evaluation<'_>> = Vec::new();

    for &route in routes {
        let (Some(risk), Some(pace)) = (risks.get(&route.id), paces.get(&route.id)) else {
            tracing::warn!(route_id = %route.id, "skipping route without risk/pace data");
            continue;
        };

        let mut rejected = None;
        if let Some(limit) = constraints.avoid_slope_degrees {
            if route.max_step_slope() > limit {
                rejected = Some("slope above threshold".to_string());
            }
        }
        if rejected.is_none() {
            if let Some(limit) = constraints.max_distance_m {
                if route.distance_m > limit {
                    rejected = Some("distance exceeds limit".to_string());
                }
            }
        }
        if rejected.is_none() {
            if let Some(deadline) = constraints.must_arrive_before {
                let arrival =
                    now + Duration::milliseconds((pace.travel_time_minutes * 60_000.0) as i64);
                if arrival > deadline {
                    rejected = Some("ETA past deadline".to_string());
                }
            }
        }

        if let Some(reason) = &rejected {
            rationale_parts.push(format!("{} rejected: {reason}", route.id));
        }

        let mut score = route.estimated_cost;
        if constraints.prefer_low_risk {
            score *= 1.0 + risk.aggregate();
        }
        evaluations.push(Evaluation {
            route,
            risk,
            pace,
            score,
            rejected,
        });
    }

    let mut best: Option<&Evaluation<'_>> = None;
    for eval in evaluations.iter().filter(|e| e.rejected.is_none()) {
        best = match best {
            None => Some(eval),
            Some(current) if better(eval, current) => Some(eval),
            Some(current) => Some(current),
        };
    }
    let Some(best) = best else {
        let rationale = if rationale_parts.is_empty() {
            "no candidate routes were provided".to_string()
        } else {
            rationale_parts.join("; ")
        };
        return Err(UnsatisfiableConstraints { rationale });
    };

    rationale_parts.push(format!(
        "{} selected with aggregate risk {:.2}",
        best.route.id,
        best.risk.aggregate()
    ));
    let rationale = rationale_parts.join("; ");

    let constraints_summary = ConstraintsSummary {
        nlt: constraints.must_arrive_before,
        max_slope_deg: constraints.avoid_slope_degrees,
        max_distance_m: constraints.max_distance_m,
        preferred: if constraints.prefer_low_risk {
            "lowest_risk".to_string()
        } else {
            "balanced".to_string()
        },
    };

    let mut alternates: Vec<Alternate> = Vec::new();
    for eval in &evaluations {
        if eval.route.id == best.route.id {
            continue;
        }
        alternates.push(describe_alternate(eval, best));
    }
    alternates.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.route_id.cmp(&b.route_id))
    });

    let best_cost = best.route.estimated_cost;
    let best_composite = best.route.composite.unwrap_or(round_to(best.score, 3));
    let mut sorted: Vec<&Evaluation<'_>> = evaluations.iter().collect();
    sorted.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
    let mut tie_breaker = "lowest composite score".to_string();
    if sorted.len() > 1 {
        let runner = sorted[1];
        tie_breaker = format!(
            "lowest composite score ({best_composite:.3} vs {:.3}) and lower estimated_cost \
             ({best_cost:.3} vs {:.3})",
            runner.score, runner.route.estimated_cost
        );
        if let Some(dominant) = dominant_class(best.route) {
            tie_breaker.push_str(&format!("; selected profile emphasizes {dominant}"));
        }
    }

    let policy = SelectionPolicy {
        id: if constraints.prefer_low_risk {
            "prefer_low_risk_v1.1".to_string()
        } else {
            "balanced_v1.1".to_string()
        },
        composite: if constraints.prefer_low_risk {
            "estimated_cost * (1 + aggregate_risk)".to_string()
        } else {
            "estimated_cost".to_string()
        },
        tiebreakers: vec![
            "lowest composite".to_string(),
            "lowest estimated_cost".to_string(),
            "greater trail_km".to_string(),
        ],
    };

    Ok(SelectionResult {
        selected_route: best.route.clone(),
        risk: best.risk.clone(),
        pace: best.pace.clone(),
        rationale,
        constraints: constraints_summary,
        alternates,
        score_definition: SCORE_DEFINITION.to_string(),
        tie_breaker,
        policy,
    })
}

fn describe_alternate(eval: &Evaluation<'_>, best: &Evaluation<'_>) -> Alternate {
    let mut reason_parts: Vec<String> = Vec::new();
    let mut reason_codes: Vec<String> = Vec::new();

    let risk_diff = eval.risk.aggregate() - best.risk.aggregate();
    if risk_diff.abs() < 0.01 {
        reason_parts.push("similar aggregate risk".to_string());
        reason_codes.push("tie_risk".to_string());
    } else if risk_diff > 0.0 {
        reason_parts.push(format!("higher aggregate risk (+{risk_diff:.2})"));
        reason_codes.push("higher_risk".to_string());
    } else {
        reason_parts.push(format!(
            "lower aggregate risk ({:.2} vs {:.2})",
            eval.risk.aggregate(),
            best.risk.aggregate()
        ));
        reason_codes.push("lower_risk".to_string());
    }

    let eta_diff = eval.pace.travel_time_minutes - best.pace.travel_time_minutes;
    if eta_diff > 0.0 {
        reason_parts.push(format!("slower ETA (+{eta_diff:.1} min)"));
        reason_codes.push("slower_eta".to_string());
    } else if eta_diff < 0.0 {
        reason_parts.push(format!("faster ETA (-{:.1} min)", -eta_diff));
        reason_codes.push("faster_eta".to_string());
    }

    if eval.route.distance_m > best.route.distance_m {
        reason_parts.push("longer distance".to_string());
        reason_codes.push("longer_distance".to_string());
    } else if eval.route.distance_m < best.route.distance_m {
        reason_parts.push("shorter distance".to_string());
        reason_codes.push("shorter_distance".to_string());
    }

    let prefer = &eval.route.constraints_used.prefer;
    if !prefer.is_empty() {
        reason_parts.push(format!("prefers {}", prefer.join(", ")));
        for pref in prefer {
            match pref.as_str() {
                "trail" => reason_codes.push("trail_pref".to_string()),
                "mixed" => reason_codes.push("mixed_profile".to_string()),
                "cover" => reason_codes.push("cover_pref".to_string()),
                _ => {}
            }
        }
    }

    if let Some(dominant) = dominant_class(eval.route) {
        reason_parts.push(format!("dominant terrain {dominant}"));
        reason_codes.push(format!("dominant_{dominant}"));
    }

    if eval.route.constraints_used.avoid.iter().any(|a| a == "open")
        && eval.route.coverage.get("open").copied().unwrap_or(0.0) > 0.0
    {
        reason_codes.push("requires_open_crossing".to_string());
    }

    if eval.route.estimated_cost > best.route.estimated_cost {
        reason_codes.push("higher_cost".to_string());
    } else if eval.route.estimated_cost < best.route.estimated_cost {
        reason_codes.push("lower_cost".to_string());
    }

    if let Some(reason) = &eval.rejected {
        reason_parts.push(format!("rejected: {reason}"));
    }

    reason_codes.sort();
    reason_codes.dedup();

    Alternate {
        route_id: eval.route.id.clone(),
        score: round_to(eval.score, 3),
        rationale: reason_parts.join(", "),
        reason_codes,
    }
}
