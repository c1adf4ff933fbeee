//! Flat-earth spatial math for grid conversion and distance calculations.
//!
//! The whole engine works in a local planar approximation with fixed
//! meters-per-degree factors; geodesic accuracy is out of scope.

use crate::models::Coordinate;

/// Meters per degree of latitude.
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Meters per degree of longitude. A fixed mid-latitude average, adequate
/// for the small operational areas this engine plans over.
pub const METERS_PER_DEG_LON: f64 = 85_000.0;

/// Planar distance between two coordinates in meters.
pub fn planar_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat) * METERS_PER_DEG_LAT;
    let dlon = (b.lon - a.lon) * METERS_PER_DEG_LON;
    (dlat * dlat + dlon * dlon).sqrt()
}

/// Minimum planar distance in meters from `point` to the segment `a`-`b`.
pub fn point_segment_distance_m(point: Coordinate, a: Coordinate, b: Coordinate) -> f64 {
    // Project into meter space so lat/lon scale differences don't skew the
    // perpendicular foot.
    let px = point.lon * METERS_PER_DEG_LON;
    let py = point.lat * METERS_PER_DEG_LAT;
    let ax = a.lon * METERS_PER_DEG_LON;
    let ay = a.lat * METERS_PER_DEG_LAT;
    let bx = b.lon * METERS_PER_DEG_LON;
    let by = b.lat * METERS_PER_DEG_LAT;

    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let fx = ax + t * dx;
    let fy = ay + t * dy;
    ((px - fx).powi(2) + (py - fy).powi(2)).sqrt()
}

/// Ray-casting point-in-polygon test over a (lat, lon) ring.
pub fn polygon_contains(ring: &[Coordinate], point: Coordinate) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].lat;
        let xi = ring[i].lon;
        let yj = ring[j].lat;
        let xj = ring[j].lon;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Round to a fixed number of decimal places (payloads round rather than
/// carry full float noise).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
