//! Location filtering primitives.
//!
//! Stateless pure functions shared by the whole pipeline: great-circle
//! distance, fix validity against the previously accepted fix, and
//! moving-average smoothing over a bounded window. The tracking session,
//! the geofence monitor, and the estimator all call the same
//! [`haversine_distance_meters`], so identical inputs give identical
//! distances at every call site.

use crate::{GeoCoord, LocationFix, MAX_ACCURACY_METERS};

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
///
/// Standard haversine with the asin/sqrt formulation:
/// `d = 2R·asin(√a)`. The square root is clamped to 1.0 so antipodal
/// points survive floating-point rounding.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// [`haversine_distance_meters`] over `[lng, lat]` coordinate pairs.
pub fn distance_between(a: GeoCoord, b: GeoCoord) -> f64 {
    haversine_distance_meters(a.lat, a.lng, b.lat, b.lng)
}

/// Decide whether a raw fix should be accepted.
///
/// - The first fix of a session (`previous` is `None`) is always trusted.
/// - A fix reporting accuracy worse than [`MAX_ACCURACY_METERS`] is a
///   low-confidence reading and is rejected regardless of distance.
/// - A fix further than `max_jump_meters` from the previous accepted
///   position is a teleport/GPS glitch and is rejected.
///
/// Timestamps are not compared: an out-of-order but spatially plausible fix
/// is still accepted. Known gap, kept to match the shipped behavior.
pub fn is_valid_update(
    previous: Option<&LocationFix>,
    candidate: &LocationFix,
    max_jump_meters: f64,
) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    if let Some(accuracy) = candidate.accuracy_m {
        if accuracy > MAX_ACCURACY_METERS {
            return false;
        }
    }

    let distance = haversine_distance_meters(
        previous.latitude,
        previous.longitude,
        candidate.latitude,
        candidate.longitude,
    );

    distance <= max_jump_meters
}

/// Smooth a fix history with an unweighted moving average.
///
/// Returns `None` for an empty history and the single fix unchanged for a
/// one-entry history. Otherwise averages latitude, longitude, and accuracy
/// over the last `window_size` entries (fewer if the history is shorter);
/// the timestamp is taken from the most recent entry. A missing accuracy
/// contributes zero to the accuracy mean.
///
/// Recent and older fixes in the window count equally; this is a
/// deliberate smoothness/simplicity trade-off, not a bug.
pub fn smooth(history: &[LocationFix], window_size: usize) -> Option<LocationFix> {
    let first = history.first()?;
    if history.len() == 1 {
        return Some(*first);
    }

    let window = &history[history.len().saturating_sub(window_size.max(1))..];
    let n = window.len() as f64;

    let avg_lat = window.iter().map(|f| f.latitude).sum::<f64>() / n;
    let avg_lng = window.iter().map(|f| f.longitude).sum::<f64>() / n;
    let avg_accuracy = window
        .iter()
        .map(|f| f.accuracy_m.unwrap_or(0.0))
        .sum::<f64>()
        / n;

    Some(LocationFix {
        latitude: avg_lat,
        longitude: avg_lng,
        accuracy_m: Some(avg_accuracy),
        timestamp_ms: window[window.len() - 1].timestamp_ms,
    })
}
