//! Route-geometry collaborator contract.
//!
//! The core consumes routed distance/duration from an external directions
//! service but never implements one. The provider is opaque: given an
//! ordered waypoint list and a travel profile it either returns metrics or
//! it doesn't, and a missing result means "metrics unavailable"; the UI
//! shows the static estimate instead. Never fatal.

use serde::{Deserialize, Serialize};

use crate::GeoCoord;

/// Travel profile for routed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelProfile {
    Walking,
    Cycling,
    Driving,
}

/// Routed metrics for an ordered waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Route geometry as `[lng, lat]` coordinates, for the map polyline.
    pub geometry: Vec<GeoCoord>,
}

/// An external directions service.
pub trait RouteMetricsProvider {
    /// Routed metrics through the waypoints in order, or `None` on any
    /// provider failure.
    fn route_metrics(&self, waypoints: &[GeoCoord], profile: TravelProfile)
        -> Option<RouteMetrics>;
}

/// Fetch routed metrics for a Krawl's waypoints.
///
/// Filters out invalid coordinates first and requires at least two usable
/// waypoints; anything less, or a provider failure, yields `None`
/// (metrics unavailable).
pub fn metrics_for_waypoints(
    provider: &dyn RouteMetricsProvider,
    waypoints: &[GeoCoord],
    profile: TravelProfile,
) -> Option<RouteMetrics> {
    let usable: Vec<GeoCoord> = waypoints
        .iter()
        .copied()
        .filter(GeoCoord::is_valid)
        .collect();

    if usable.len() < 2 {
        return None;
    }
    provider.route_metrics(&usable, profile)
}
