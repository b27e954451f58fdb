//! Session completion statistics.
//!
//! Computed when a Krawl session ends (or is abandoned) for the completion
//! screen, and when reconstructing a past session from its stored trail.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::filter::haversine_distance_meters;
use crate::trail::TrailSample;

/// Raw facts about a session, as tracked by the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub started_at_ms: i64,
    /// `None` while the session is still running; stats then use "now".
    pub ended_at_ms: Option<i64>,
    pub total_distance_meters: f64,
    pub completed_waypoints: u32,
    pub total_waypoints: u32,
}

/// Derived statistics for the completion screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub total_time_minutes: i64,
    pub total_distance_meters: f64,
    pub waypoints_visited: u32,
    pub total_waypoints: u32,
    pub completion_timestamp_ms: i64,
    pub average_time_per_waypoint_min: i64,
    /// Rounded to one decimal.
    pub average_distance_per_waypoint_m: f64,
}

/// Calculate completion statistics from session data. Averages guard the
/// zero-visited case (an abandoned session).
pub fn completion_stats(data: &SessionData) -> CompletionStats {
    let ended_at_ms = data
        .ended_at_ms
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let total_time_minutes =
        ((ended_at_ms - data.started_at_ms) as f64 / 60_000.0).round() as i64;

    let visited = data.completed_waypoints;
    let average_time_per_waypoint_min = if visited > 0 {
        (total_time_minutes as f64 / f64::from(visited)).round() as i64
    } else {
        0
    };
    let average_distance_per_waypoint_m = if visited > 0 {
        (data.total_distance_meters / f64::from(visited) * 10.0).round() / 10.0
    } else {
        0.0
    };

    CompletionStats {
        total_time_minutes,
        total_distance_meters: data.total_distance_meters,
        waypoints_visited: visited,
        total_waypoints: data.total_waypoints,
        completion_timestamp_ms: ended_at_ms,
        average_time_per_waypoint_min,
        average_distance_per_waypoint_m,
    }
}

/// Total distance walked along a stored trail, in meters.
///
/// The trail store returns samples unordered; this sorts by timestamp
/// before summing segment distances. Used to rebuild
/// [`SessionData::total_distance_meters`] offline.
pub fn trail_distance_meters(samples: &[TrailSample]) -> f64 {
    let mut ordered: Vec<&TrailSample> = samples.iter().collect();
    ordered.sort_by_key(|sample| sample.timestamp_ms);
    ordered
        .windows(2)
        .map(|pair| {
            haversine_distance_meters(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .sum()
}

/// Format a duration in minutes for display: "45m", "1h", "1h 30m".
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {remaining}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(completed: u32) -> SessionData {
        SessionData {
            started_at_ms: 1_000_000,
            ended_at_ms: Some(1_000_000 + 90 * 60_000),
            total_distance_meters: 4_500.0,
            completed_waypoints: completed,
            total_waypoints: 6,
        }
    }

    #[test]
    fn test_completion_stats() {
        let stats = completion_stats(&session(5));
        assert_eq!(stats.total_time_minutes, 90);
        assert_eq!(stats.waypoints_visited, 5);
        assert_eq!(stats.total_waypoints, 6);
        assert_eq!(stats.average_time_per_waypoint_min, 18);
        assert_eq!(stats.average_distance_per_waypoint_m, 900.0);
        assert_eq!(stats.completion_timestamp_ms, 1_000_000 + 90 * 60_000);
    }

    #[test]
    fn test_zero_visited_guards_averages() {
        let stats = completion_stats(&session(0));
        assert_eq!(stats.average_time_per_waypoint_min, 0);
        assert_eq!(stats.average_distance_per_waypoint_m, 0.0);
    }

    #[test]
    fn test_running_session_uses_now() {
        let mut data = session(2);
        data.ended_at_ms = None;
        data.started_at_ms = Utc::now().timestamp_millis() - 10 * 60_000;

        let stats = completion_stats(&data);
        assert!((9..=11).contains(&stats.total_time_minutes));
    }

    #[test]
    fn test_average_distance_rounds_to_one_decimal() {
        let mut data = session(3);
        data.total_distance_meters = 1_000.0;
        let stats = completion_stats(&data);
        assert_eq!(stats.average_distance_per_waypoint_m, 333.3);
    }

    #[test]
    fn test_trail_distance_sorts_before_summing() {
        let sample = |lat: f64, ts: i64| TrailSample {
            id: None,
            session_id: "s1".to_string(),
            latitude: lat,
            longitude: 123.90,
            accuracy_m: None,
            timestamp_ms: ts,
        };

        // Out of order on purpose: walking 10.300 → 10.309 in two legs
        // (~1000m total), not three legs of back-and-forth.
        let samples = vec![sample(10.309, 3), sample(10.300, 1), sample(10.3045, 2)];
        let distance = trail_distance_meters(&samples);
        assert!((distance - 1000.0).abs() < 10.0, "got {distance}");

        assert_eq!(trail_distance_meters(&[]), 0.0);
        assert_eq!(trail_distance_meters(&[sample(10.30, 1)]), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(60), "1h");
        assert_eq!(format_duration(90), "1h 30m");
    }
}
