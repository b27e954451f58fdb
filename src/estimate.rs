//! Live distance and walking-time estimation.
//!
//! Derives "how far / how long" hints from the current smoothed position
//! and a target coordinate. The ETA divides the great-circle distance by a
//! fixed assumed walking speed. It is a static heuristic, not a routed
//! estimate, which is fine for the hint it drives. Routed metrics come
//! from the [`crate::route`] collaborator instead.

use serde::{Deserialize, Serialize};

use crate::filter::distance_between;
use crate::GeoCoord;

/// Assumed walking speed: 5 km/h ≈ 1.389 m/s.
pub const WALKING_SPEED_MPS: f64 = 5.0 * 1000.0 / 3600.0;

/// A distance/ETA pair for the next stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub distance_meters: f64,
    pub eta_seconds: f64,
}

/// Estimate distance and walking time from `current` to `target`.
///
/// Returns `None` when either side is unknown; the caller renders a
/// "calculating…" placeholder until both are available.
pub fn estimate(current: Option<GeoCoord>, target: Option<GeoCoord>) -> Option<Estimate> {
    let (current, target) = (current?, target?);
    let distance_meters = distance_between(current, target);
    Some(Estimate {
        distance_meters,
        eta_seconds: distance_meters / WALKING_SPEED_MPS,
    })
}

/// Format a distance for display: "350 m", "1.2 km", "12 km".
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        return format!("{} m", meters.round() as i64);
    }
    let km = meters / 1000.0;
    if km < 10.0 {
        format!("{km:.1} km")
    } else {
        format!("{} km", km.round() as i64)
    }
}

/// Format an ETA for display: "< 1 min", "12 min", "1h 30m".
pub fn format_eta(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as i64;
    if minutes < 1 {
        return "< 1 min".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {remaining}m")
    }
}
