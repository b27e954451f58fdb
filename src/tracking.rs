//! Continuous location tracking session.
//!
//! Owns one subscription to the OS location stream and runs every raw fix
//! through the acceptance pipeline: validity filter → bounded history →
//! moving-average smoothing → republish → optional trail append. The
//! session republishes a smoothed position on every accepted update and
//! never republishes a rejected one, so downstream consumers (geofence
//! monitor, estimator, map renderer) only ever see plausible movement.
//!
//! Error policy: failures that are actionable by the UI (permission denied,
//! unsupported platform, stream errors) surface through `start`'s `Result`
//! or the `on_error` callback. Trail persistence failures never do; the
//! trail store absorbs them itself.

use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::error::Result;
use crate::filter::{is_valid_update, smooth};
use crate::source::{LocationSource, SourceEvent, SubscribeOptions};
use crate::trail::{LocationTrailStore, TrailSample};
use crate::{LocationFix, NavError, DEFAULT_MAX_JUMP_METERS, DEFAULT_SMOOTHING_WINDOW};

/// Bounded length of the in-memory fix history.
const MAX_HISTORY: usize = 5;

/// Smoothing kicks in once this many accepted fixes are buffered; before
/// that the raw fix is republished unchanged.
const MIN_SAMPLES_FOR_SMOOTHING: usize = 3;

/// Session tuning. Defaults match the shipped app behavior.
#[derive(Debug, Clone)]
pub struct TrackingOptions {
    /// When set, every accepted fix is also appended to the trail store
    /// under this session id.
    pub session_id: Option<String>,

    /// Requested fix cadence, also used as the per-fix timeout handed to
    /// the location source. Default: 5000 ms.
    pub update_interval_ms: u64,

    /// Request the high-accuracy (GPS) pipeline. Default: true.
    pub high_accuracy: bool,

    /// Jump-rejection threshold for the validity filter. Default: 1000 m.
    pub max_jump_meters: f64,

    /// Moving-average window. Default: 3.
    pub smoothing_window: usize,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            update_interval_ms: 5_000,
            high_accuracy: true,
            max_jump_meters: DEFAULT_MAX_JUMP_METERS,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Orchestrates a single continuous location subscription.
///
/// The session does not spawn its own task: `start` subscribes and hands
/// back the event stream, and the owner pumps each event through
/// [`handle_event`](Self::handle_event), normally via [`crate::driver::drive`]
/// or manually in tests. Only one session should hold the OS subscription
/// at a time; the composing layer is responsible for not starting two.
pub struct LocationTrackingSession {
    options: TrackingOptions,
    source: Box<dyn LocationSource>,
    trail: Option<LocationTrailStore>,
    on_update: Option<Box<dyn FnMut(&LocationFix) + Send>>,
    on_error: Option<Box<dyn FnMut(&NavError) + Send>>,
    history: Vec<LocationFix>,
    last_accepted: Option<LocationFix>,
    current: Option<LocationFix>,
    running: bool,
}

impl LocationTrackingSession {
    pub fn new(options: TrackingOptions, source: Box<dyn LocationSource>) -> Self {
        Self {
            options,
            source,
            trail: None,
            on_update: None,
            on_error: None,
            history: Vec::new(),
            last_accepted: None,
            current: None,
            running: false,
        }
    }

    /// Attach a trail store. Samples are appended only when
    /// [`TrackingOptions::session_id`] is also set.
    pub fn with_trail_store(mut self, store: LocationTrailStore) -> Self {
        self.trail = Some(store);
        self
    }

    /// Called with every accepted (smoothed) position.
    pub fn on_update(mut self, callback: impl FnMut(&LocationFix) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Called with stream-level errors (permission denied, timeout, ...).
    pub fn on_error(mut self, callback: impl FnMut(&NavError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Subscribe to the location source and return the event stream for the
    /// owner to pump. Subscription-time failures (permission denied,
    /// unsupported) are returned synchronously.
    pub fn start(&mut self) -> Result<UnboundedReceiver<SourceEvent>> {
        if self.running {
            return Err(NavError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscribe_options = SubscribeOptions {
            high_accuracy: self.options.high_accuracy,
            timeout_ms: self.options.update_interval_ms,
        };
        self.source.subscribe(&subscribe_options, tx)?;

        self.history.clear();
        self.last_accepted = None;
        self.current = None;
        self.running = true;
        debug!(
            "[Tracking] Session started (session_id={:?})",
            self.options.session_id
        );
        Ok(rx)
    }

    /// Cancel the subscription. Idempotent: safe to call when not started.
    /// After `stop` returns, `handle_event` ignores any still-buffered
    /// events, so no callback fires past this point.
    pub fn stop(&mut self) {
        if self.running {
            self.source.unsubscribe();
            self.running = false;
            debug!("[Tracking] Session stopped");
        }
    }

    /// Feed one stream event through the pipeline. Returns the newly
    /// accepted smoothed position, or `None` for rejected fixes, errors,
    /// and events arriving after `stop`.
    pub fn handle_event(&mut self, event: SourceEvent) -> Option<LocationFix> {
        if !self.running {
            return None;
        }
        match event {
            SourceEvent::Fix(fix) => self.handle_fix(fix),
            SourceEvent::Error(err) => {
                warn!("[Tracking] Location stream error: {err}");
                if let Some(cb) = self.on_error.as_mut() {
                    cb(&err);
                }
                None
            }
        }
    }

    fn handle_fix(&mut self, fix: LocationFix) -> Option<LocationFix> {
        // Data-quality rejection is not an error: drop the fix and keep the
        // previously accepted position as current.
        if !is_valid_update(self.last_accepted.as_ref(), &fix, self.options.max_jump_meters) {
            debug!(
                "[Tracking] Rejected fix at ({:.5}, {:.5}), accuracy {:?}",
                fix.latitude, fix.longitude, fix.accuracy_m
            );
            return None;
        }

        self.history.push(fix);
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }

        let smoothed = if self.history.len() >= MIN_SAMPLES_FOR_SMOOTHING {
            smooth(&self.history, self.options.smoothing_window).unwrap_or(fix)
        } else {
            fix
        };

        self.current = Some(smoothed);
        // The next raw fix is validated against the smoothed position, not
        // the raw one, matching the shipped pipeline.
        self.last_accepted = Some(smoothed);

        if let Some(session_id) = &self.options.session_id {
            if let Some(trail) = &self.trail {
                // Fire-and-forget: the store logs and absorbs failures.
                trail.append(&TrailSample {
                    id: None,
                    session_id: session_id.clone(),
                    latitude: smoothed.latitude,
                    longitude: smoothed.longitude,
                    accuracy_m: smoothed.accuracy_m,
                    timestamp_ms: smoothed.timestamp_ms,
                });
            }
        }

        if let Some(cb) = self.on_update.as_mut() {
            cb(&smoothed);
        }
        Some(smoothed)
    }

    /// The latest smoothed position, if any fix has been accepted.
    pub fn current_position(&self) -> Option<LocationFix> {
        self.current
    }

    /// Reported accuracy of the latest smoothed position.
    pub fn accuracy(&self) -> Option<f64> {
        self.current.and_then(|fix| fix.accuracy_m)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn options(&self) -> &TrackingOptions {
        &self.options
    }
}
