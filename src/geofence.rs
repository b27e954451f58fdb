//! Multi-zone geofence monitoring with debounced arrival detection.
//!
//! The monitor owns a set of named circular zones and evaluates them against
//! the most recent position. Per zone the state machine is:
//!
//! ```text
//! Outside → (distance ≤ radius, debounce elapses, not triggered) → Inside+Triggered
//!         → (distance > radius) → Outside
//! ```
//!
//! An entry callback fires once per debounce-confirmed entry: the position
//! must remain inside the zone continuously for the whole debounce window,
//! so a single noisy fix at the boundary never triggers. After a confirmed
//! entry the zone stays armed-off until the re-entry cooldown since that
//! entry has elapsed, which stops boundary jitter from re-revealing a stop
//! the user is lingering next to while still allowing a legitimate second
//! visit.
//!
//! Time is data here: every evaluation takes `now_ms` explicitly, and
//! "timers" are anchor timestamps checked on the next evaluation. Feed the
//! monitor from [`update_location`](GeofenceMonitor::update_location) on
//! each accepted fix and from [`tick`](GeofenceMonitor::tick) on a periodic
//! cadence (the [`crate::driver`] pump does both); the tick is what
//! confirms a debounce while the device sits still and no new fix arrives.

use log::debug;

use crate::filter::distance_between;
use crate::GeoCoord;

/// Entry callback: zone id and current distance to center in meters.
pub type EntryCallback = Box<dyn FnMut(&str, f64) + Send>;

/// Exit callback: zone id.
pub type ExitCallback = Box<dyn FnMut(&str) + Send>;

/// Monitor tuning. Defaults match the shipped app behavior.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How long a position must remain inside a zone before the entry
    /// callback fires. Default: 2000 ms.
    pub debounce_ms: i64,

    /// Cooldown since the last confirmed entry before a zone re-arms for
    /// another entry. Default: 30 000 ms.
    pub reentry_cooldown_ms: i64,

    /// Cadence at which the owner should call `tick`. Default: 2000 ms.
    pub eval_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            reentry_cooldown_ms: 30_000,
            eval_interval_ms: 2_000,
        }
    }
}

/// One registered zone. Mutated only by the monitor's evaluation step.
struct Zone {
    id: String,
    center: GeoCoord,
    radius_m: f64,
    on_entry: Option<EntryCallback>,
    on_exit: Option<ExitCallback>,
    is_inside: bool,
    has_triggered: bool,
    /// When the position crossed inside and started the pending debounce.
    inside_since_ms: Option<i64>,
    /// Crossing time of the last debounce-confirmed entry.
    last_entry_ms: Option<i64>,
}

/// Owns named circular zones and emits debounced entry/exit events.
///
/// One monitor instance belongs to one Krawl Mode session; construct it
/// explicitly and drop or [`clear_all`](Self::clear_all) it when the
/// session ends. Zones are evaluated in registration order.
pub struct GeofenceMonitor {
    zones: Vec<Zone>,
    current: Option<GeoCoord>,
    /// The most recent `now_ms` seen, used when `add_zone` evaluates a new
    /// zone immediately against the last known position.
    last_now_ms: Option<i64>,
    config: MonitorConfig,
    monitoring: bool,
}

impl GeofenceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            zones: Vec::new(),
            current: None,
            last_now_ms: None,
            config,
            monitoring: false,
        }
    }

    /// Register a zone, replacing any existing zone with the same id
    /// (the replacement starts from a clean `Outside` state). If a position
    /// is already known the zone is evaluated against it immediately, so a
    /// zone added while the user stands inside it starts its debounce
    /// without waiting for the next fix.
    pub fn add_zone(
        &mut self,
        id: &str,
        center: GeoCoord,
        radius_m: f64,
        on_entry: Option<EntryCallback>,
        on_exit: Option<ExitCallback>,
    ) {
        self.remove_zone(id);

        self.zones.push(Zone {
            id: id.to_string(),
            center,
            radius_m,
            on_entry,
            on_exit,
            is_inside: false,
            has_triggered: false,
            inside_since_ms: None,
            last_entry_ms: None,
        });
        self.monitoring = true;

        if let (Some(position), Some(now_ms)) = (self.current, self.last_now_ms) {
            if let Some(zone) = self.zones.last_mut() {
                Self::evaluate_zone(zone, position, now_ms, &self.config);
            }
        }
    }

    /// Unregister a zone, cancelling its pending debounce. Monitoring stops
    /// when the last zone goes.
    pub fn remove_zone(&mut self, id: &str) {
        self.zones.retain(|zone| zone.id != id);
        if self.zones.is_empty() {
            self.monitoring = false;
        }
    }

    /// Store the latest position and evaluate all zones against it
    /// synchronously, in registration order.
    pub fn update_location(&mut self, position: GeoCoord, now_ms: i64) {
        self.current = Some(position);
        self.last_now_ms = Some(now_ms);
        for zone in &mut self.zones {
            Self::evaluate_zone(zone, position, now_ms, &self.config);
        }
    }

    /// Periodic re-evaluation against the stored position. This is what
    /// confirms a pending debounce (and re-arms cooldowns) while the user
    /// is stationary and no new fix arrives.
    pub fn tick(&mut self, now_ms: i64) {
        let Some(position) = self.current else {
            return;
        };
        self.last_now_ms = Some(now_ms);
        for zone in &mut self.zones {
            Self::evaluate_zone(zone, position, now_ms, &self.config);
        }
    }

    fn evaluate_zone(zone: &mut Zone, position: GeoCoord, now_ms: i64, config: &MonitorConfig) {
        let distance = distance_between(position, zone.center);
        let inside = distance <= zone.radius_m;

        // Crossing in: re-arm if the cooldown has elapsed, then anchor the
        // debounce window.
        if inside && !zone.is_inside {
            zone.is_inside = true;
            if zone.has_triggered && Self::cooldown_elapsed(zone, now_ms, config) {
                zone.has_triggered = false;
            }
            if !zone.has_triggered {
                zone.inside_since_ms = Some(now_ms);
                debug!(
                    "[Geofence] {} crossed inside ({:.1}m from center), debouncing",
                    zone.id, distance
                );
            }
        }

        // Debounce-confirmed entry: still inside, anchored long enough ago.
        if inside && !zone.has_triggered {
            if let Some(since) = zone.inside_since_ms {
                if now_ms - since >= config.debounce_ms {
                    zone.has_triggered = true;
                    zone.last_entry_ms = Some(since);
                    zone.inside_since_ms = None;
                    debug!("[Geofence] {} entry confirmed ({:.1}m)", zone.id, distance);
                    if let Some(cb) = zone.on_entry.as_mut() {
                        cb(&zone.id, distance);
                    }
                }
            }
        }

        // Crossing out: cancel any pending debounce, re-arm if the cooldown
        // has elapsed.
        if !inside && zone.is_inside {
            zone.is_inside = false;
            zone.inside_since_ms = None;
            if zone.has_triggered && Self::cooldown_elapsed(zone, now_ms, config) {
                zone.has_triggered = false;
            }
            debug!("[Geofence] {} exited ({:.1}m)", zone.id, distance);
            if let Some(cb) = zone.on_exit.as_mut() {
                cb(&zone.id);
            }
        }
    }

    fn cooldown_elapsed(zone: &Zone, now_ms: i64, config: &MonitorConfig) -> bool {
        zone.last_entry_ms
            .is_some_and(|entry| now_ms - entry > config.reentry_cooldown_ms)
    }

    /// Distance from the current position to a zone's center, or `None`
    /// when the zone is unknown or no position has been seen yet.
    pub fn get_distance(&self, id: &str) -> Option<f64> {
        let position = self.current?;
        self.zones
            .iter()
            .find(|zone| zone.id == id)
            .map(|zone| distance_between(position, zone.center))
    }

    /// Whether the current position lies within a zone's radius.
    pub fn is_within_radius(&self, id: &str) -> bool {
        self.zones
            .iter()
            .find(|zone| zone.id == id)
            .zip(self.current)
            .is_some_and(|(zone, position)| distance_between(position, zone.center) <= zone.radius_m)
    }

    /// Clear a zone's triggered flag so its next entry crossing fires again
    /// without waiting for the cooldown. Used by the session when a stop is
    /// explicitly skipped or checked off.
    pub fn reset_trigger(&mut self, id: &str) {
        if let Some(zone) = self.zones.iter_mut().find(|zone| zone.id == id) {
            zone.has_triggered = false;
        }
    }

    /// Drop every zone (cancelling pending debounces) and forget the
    /// current position. Equivalent to destroying the monitor at session
    /// end.
    pub fn clear_all(&mut self) {
        self.zones.clear();
        self.current = None;
        self.last_now_ms = None;
        self.monitoring = false;
    }

    /// Ids of all registered zones, in registration order.
    pub fn active_zone_ids(&self) -> Vec<String> {
        self.zones.iter().map(|zone| zone.id.clone()).collect()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// True while at least one zone is registered.
    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Cadence the owner should drive [`tick`](Self::tick) at.
    pub fn eval_interval_ms(&self) -> u64 {
        self.config.eval_interval_ms
    }
}
