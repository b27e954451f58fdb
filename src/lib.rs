//! # Krawl Nav
//!
//! Live navigation core for Krawl Mode: consumes a noisy stream of device
//! location fixes and turns it into a smoothed position estimate, debounced
//! arrival/departure events for named circular zones, and an idempotent
//! reveal state machine for per-stop content.
//!
//! The crate has no network or rendering surface. Its collaborators are
//! in-process contracts:
//!
//! - [`LocationSource`]: the OS continuous-location stream (implemented by
//!   the embedding app, mocked in tests)
//! - [`LocationTrailStore`]: local SQLite persistence of the location trail
//! - [`RouteMetricsProvider`]: an opaque directions service, consumed only
//!
//! ## Pipeline
//!
//! ```text
//! OS stream → LocationTrackingSession (filter + smooth + persist)
//!          → smoothed position → { GeofenceMonitor, DistanceTimeEstimator, map }
//! GeofenceMonitor entry → StopContentController → UI reveal/dismiss
//! ```
//!
//! ## Quick start
//!
//! ```
//! use krawl_nav::{GeofenceMonitor, GeoCoord, MonitorConfig};
//!
//! let mut monitor = GeofenceMonitor::new(MonitorConfig::default());
//! monitor.add_zone(
//!     "gem-1",
//!     GeoCoord::new(123.90, 10.30),
//!     50.0,
//!     Some(Box::new(|id: &str, distance: f64| {
//!         println!("arrived at {} ({:.0}m from center)", id, distance);
//!     })),
//!     None,
//! );
//! monitor.update_location(GeoCoord::new(123.9001, 10.3001), 1_000);
//! monitor.tick(4_000); // debounce elapses, entry fires
//! ```
//!
//! All state machines take time as explicit `now_ms` arguments; nothing in
//! the core reads the wall clock, which keeps every transition deterministic
//! under test. The [`driver`] module supplies the one async surface: a tokio
//! pump that feeds a session and a monitor from real timers.

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{NavError, Result};

// Pure location filtering (validity, haversine, smoothing)
pub mod filter;
pub use filter::{distance_between, haversine_distance_meters, is_valid_update, smooth};

// SQLite location trail persistence
pub mod trail;
pub use trail::{LocationTrailStore, TrailSample};

// Multi-zone geofence entry/exit detection
pub mod geofence;
pub use geofence::{EntryCallback, ExitCallback, GeofenceMonitor, MonitorConfig};

// OS location stream collaborator contract
pub mod source;
pub use source::{LocationSource, SourceEvent, SubscribeOptions};

// Continuous tracking session (filter + smooth + republish + persist)
pub mod tracking;
pub use tracking::{LocationTrackingSession, TrackingOptions};

// Stop content reveal state machine
pub mod content;
pub use content::{StopContentController, StopContentState, WaypointContent};

// Distance / walking-time estimation
pub mod estimate;
pub use estimate::{estimate, format_distance, format_eta, Estimate};

// Session completion statistics
pub mod stats;
pub use stats::{completion_stats, CompletionStats, SessionData};

// Route-geometry collaborator contract
pub mod route;
pub use route::{metrics_for_waypoints, RouteMetrics, RouteMetricsProvider, TravelProfile};

// Tokio event pump wiring session + monitor + cancellation
pub mod driver;
pub use driver::{drive, DriveConfig};

// ============================================================================
// Core Types
// ============================================================================

/// Maximum tolerated reported accuracy before a fix is considered
/// low-confidence and discarded, in meters.
pub const MAX_ACCURACY_METERS: f64 = 100.0;

/// Default maximum plausible distance between consecutive fixes, in meters.
/// Larger jumps are treated as GPS glitches.
pub const DEFAULT_MAX_JUMP_METERS: f64 = 1000.0;

/// Default moving-average window for position smoothing.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 3;

/// A geographic coordinate as a named longitude/latitude pair.
///
/// The field order deliberately mirrors the `[longitude, latitude]` tuples
/// used throughout the app's map layer (GeoJSON order, the reverse of the
/// spoken "lat, lng" convention). Always construct with
/// [`GeoCoord::new(lng, lat)`](GeoCoord::new) or convert from a
/// `[lng, lat]` array; the named fields make a transposition impossible to
/// write silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    /// Longitude in degrees, first, as in `[lng, lat]`.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoCoord {
    /// Create a coordinate from longitude and latitude, in that order.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Check that both axes are finite and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }
}

impl From<[f64; 2]> for GeoCoord {
    /// Convert from a `[longitude, latitude]` array.
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

/// A single fix from the device location stream.
///
/// Produced by the [`LocationSource`] collaborator; immutable once created.
/// `accuracy_m` is the reported horizontal accuracy radius when the source
/// provides one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub timestamp_ms: i64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: Option<f64>, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp_ms,
        }
    }

    /// The fix's position as a `[lng, lat]` coordinate pair.
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.longitude, self.latitude)
    }
}

// ============================================================================
// Tests
// ============================================================================
