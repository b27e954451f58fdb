//! Event pump wiring a tracking session to a geofence monitor.
//!
//! The core state machines are synchronous and clock-free; this module is
//! the one place real timers live. [`drive`] subscribes the session, then
//! loops over three signals until cancelled: location-stream events (fed
//! through the session, with each accepted position forwarded to the
//! monitor), a periodic tick at the monitor's evaluation cadence (which is
//! what confirms a debounce while the user stands still), and the
//! cancellation token. Cancellation stops the session synchronously before
//! returning, so no callback fires afterwards.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::geofence::GeofenceMonitor;
use crate::tracking::LocationTrackingSession;

/// Millisecond wall-clock source. Injected so tests can drive the monitor
/// with synthetic time; production uses [`system_clock`].
pub type MsClock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The real clock: Unix epoch milliseconds.
pub fn system_clock() -> MsClock {
    Arc::new(|| Utc::now().timestamp_millis())
}

/// Pump configuration.
#[derive(Clone)]
pub struct DriveConfig {
    pub clock: MsClock,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            clock: system_clock(),
        }
    }
}

/// Run the session/monitor pump until the token is cancelled or the
/// location source closes its stream.
///
/// Subscription-time errors from [`LocationTrackingSession::start`]
/// (permission denied, unsupported) are returned immediately; everything
/// after that is delivered through the session's callbacks.
pub async fn drive(
    session: &mut LocationTrackingSession,
    monitor: &mut GeofenceMonitor,
    config: DriveConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut events = session.start()?;

    let mut ticker = interval(Duration::from_millis(monitor.eval_interval_ms().max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("[Driver] Pump started");
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if let Some(position) = session.handle_event(event) {
                            monitor.update_location(position.coord(), (config.clock)());
                        }
                    }
                    None => {
                        debug!("[Driver] Location source closed its stream");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if monitor.is_monitoring() {
                    monitor.tick((config.clock)());
                }
            }
            _ = cancel.cancelled() => {
                debug!("[Driver] Cancelled");
                break;
            }
        }
    }

    session.stop();
    info!("[Driver] Pump stopped");
    Ok(())
}
