//! End-to-end tests for a composed Krawl Mode session: location source →
//! tracking session → geofence monitor → stop content controller, with the
//! trail store recording along the way.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use krawl_nav::{
    drive, estimate, DriveConfig, GeoCoord, GeofenceMonitor, LocationFix, LocationSource,
    LocationTrackingSession, LocationTrailStore, MonitorConfig, Result, SourceEvent,
    StopContentController, SubscribeOptions, TrackingOptions,
};

/// Waypoint P for the scenario: a 30m zone in Cebu City.
const P: GeoCoord = GeoCoord {
    lng: 123.90,
    lat: 10.30,
};

fn fix_near_p(offset_deg: f64, ts: i64) -> LocationFix {
    // 0.00005° of latitude ≈ 5.5m; offsets stay well within 10m of P.
    LocationFix::new(P.lat + offset_deg, P.lng, Some(8.0), ts)
}

/// Source double whose event sender is handed to the test through a shared
/// slot, so fixes can be pushed synchronously.
#[derive(Clone)]
struct SlotSource {
    slot: Arc<Mutex<Option<UnboundedSender<SourceEvent>>>>,
}

impl SlotSource {
    fn new() -> (Self, Arc<Mutex<Option<UnboundedSender<SourceEvent>>>>) {
        let slot = Arc::new(Mutex::new(None));
        (Self { slot: Arc::clone(&slot) }, slot)
    }
}

impl LocationSource for SlotSource {
    fn subscribe(
        &mut self,
        _options: &SubscribeOptions,
        events: UnboundedSender<SourceEvent>,
    ) -> Result<()> {
        *self.slot.lock().unwrap() = Some(events);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        *self.slot.lock().unwrap() = None;
    }
}

/// Source double that replays a scripted fix sequence on a timer.
struct ScriptedSource {
    fixes: Vec<LocationFix>,
    interval_ms: u64,
    delay_ms: u64,
    worker: Option<JoinHandle<()>>,
}

impl ScriptedSource {
    fn new(fixes: Vec<LocationFix>, interval_ms: u64, delay_ms: u64) -> Self {
        Self {
            fixes,
            interval_ms,
            delay_ms,
            worker: None,
        }
    }
}

impl LocationSource for ScriptedSource {
    fn subscribe(
        &mut self,
        _options: &SubscribeOptions,
        events: UnboundedSender<SourceEvent>,
    ) -> Result<()> {
        let fixes = self.fixes.clone();
        let interval_ms = self.interval_ms;
        let delay_ms = self.delay_ms;
        self.worker = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            for fix in fixes {
                if events.send(SourceEvent::Fix(fix)).is_err() {
                    break;
                }
                sleep(Duration::from_millis(interval_ms)).await;
            }
        }));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

fn pump_into_monitor(
    session: &mut LocationTrackingSession,
    rx: &mut UnboundedReceiver<SourceEvent>,
    monitor: &mut GeofenceMonitor,
) {
    while let Ok(event) = rx.try_recv() {
        if let Some(position) = session.handle_event(event) {
            // Deterministic pump: the fix timestamp is the clock.
            monitor.update_location(position.coord(), position.timestamp_ms);
        }
    }
}

/// The headline scenario: five fixes at 1s intervals inside a 30m zone at P
/// produce exactly one debounce-confirmed arrival, a revealed stop card,
/// and five trail samples.
#[test]
fn five_fixes_one_arrival_five_trail_samples() {
    let store = LocationTrailStore::in_memory().unwrap();
    let (source, slot) = SlotSource::new();

    let mut session = LocationTrackingSession::new(
        TrackingOptions {
            session_id: Some("krawl-e2e".to_string()),
            ..TrackingOptions::default()
        },
        Box::new(source),
    )
    .with_trail_store(store.clone());

    let mut monitor = GeofenceMonitor::new(MonitorConfig::default());
    let controller = Arc::new(Mutex::new(StopContentController::new()));
    let entries: Arc<Mutex<Vec<(String, f64)>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let controller = Arc::clone(&controller);
        let entries = Arc::clone(&entries);
        monitor.add_zone(
            "gem-1",
            P,
            30.0,
            Some(Box::new(move |id: &str, distance: f64| {
                entries.lock().unwrap().push((id.to_string(), distance));
                controller.lock().unwrap().on_geofence_entry(id);
            })),
            None,
        );
    }

    let mut rx = session.start().unwrap();
    let tx = slot.lock().unwrap().clone().unwrap();
    for i in 0..5i64 {
        let offset = 0.00001 * i as f64; // drifts ~1m per fix, all within 10m
        tx.send(SourceEvent::Fix(fix_near_p(offset, i * 1_000)))
            .unwrap();
    }
    pump_into_monitor(&mut session, &mut rx, &mut monitor);

    // Exactly one entry, confirmed within the debounce window (anchor t=0,
    // debounce 2s, fixes through t=4s).
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1, "expected exactly one arrival");
    let (id, distance) = &entries[0];
    assert_eq!(id, "gem-1");
    assert!(*distance <= 30.0, "arrival distance {distance}");

    // The card is up for the right waypoint.
    let controller = controller.lock().unwrap();
    assert!(controller.is_visible());
    assert_eq!(
        controller.state().current_waypoint_id.as_deref(),
        Some("gem-1")
    );

    // All five accepted fixes were persisted for this session.
    assert_eq!(store.get_all("krawl-e2e").len(), 5);
}

/// Arriving, checking off, and moving to the next stop: the zone is removed
/// after check-off and the estimator points at the next waypoint.
#[test]
fn check_off_flow_releases_zone_and_estimates_next() {
    let (source, slot) = SlotSource::new();
    let mut session =
        LocationTrackingSession::new(TrackingOptions::default(), Box::new(source));

    let mut monitor = GeofenceMonitor::new(MonitorConfig::default());
    let controller = Arc::new(Mutex::new(StopContentController::new()));
    {
        let controller = Arc::clone(&controller);
        monitor.add_zone(
            "gem-1",
            P,
            30.0,
            Some(Box::new(move |id: &str, _| {
                controller.lock().unwrap().on_geofence_entry(id);
            })),
            None,
        );
    }

    let mut rx = session.start().unwrap();
    let tx = slot.lock().unwrap().clone().unwrap();
    for i in 0..3i64 {
        tx.send(SourceEvent::Fix(fix_near_p(0.0, i * 1_000))).unwrap();
    }
    pump_into_monitor(&mut session, &mut rx, &mut monitor);
    assert!(controller.lock().unwrap().is_visible());

    // User checks the stop off; the session layer dismisses the card and
    // releases the zone so it cannot re-open.
    {
        let mut controller = controller.lock().unwrap();
        assert!(controller.check_off("gem-1"));
        controller.dismiss();
    }
    monitor.remove_zone("gem-1");
    assert!(!monitor.is_monitoring());
    monitor.tick(60_000);
    assert!(!controller.lock().unwrap().is_visible());

    // Next waypoint ~1km north: distance and walking ETA for the header.
    let next = GeoCoord::new(123.90, 10.309);
    let position = session.current_position().map(|fix| fix.coord());
    let est = estimate(position, Some(next)).unwrap();
    assert!((est.distance_meters - 1000.0).abs() < 20.0);
    assert!((est.eta_seconds - 720.0).abs() < 20.0);
}

/// Live pump: a scripted source walks into the zone and the driver confirms
/// the arrival through real timers.
#[tokio::test(flavor = "multi_thread")]
async fn driver_confirms_arrival_with_real_timers() {
    let fixes: Vec<LocationFix> = (0..5i64)
        .map(|i| fix_near_p(0.00001 * i as f64, i * 30))
        .collect();
    let source = ScriptedSource::new(fixes, 30, 0);

    let updates = Arc::new(Mutex::new(0usize));
    let updates_counter = Arc::clone(&updates);
    let mut session =
        LocationTrackingSession::new(TrackingOptions::default(), Box::new(source))
            .on_update(move |_| *updates_counter.lock().unwrap() += 1);

    // Short windows so the test completes quickly; semantics are identical.
    let mut monitor = GeofenceMonitor::new(MonitorConfig {
        debounce_ms: 100,
        reentry_cooldown_ms: 1_000,
        eval_interval_ms: 20,
    });
    let entries = Arc::new(Mutex::new(0usize));
    let entries_counter = Arc::clone(&entries);
    monitor.add_zone(
        "gem-1",
        P,
        30.0,
        Some(Box::new(move |_: &str, _| {
            *entries_counter.lock().unwrap() += 1;
        })),
        None,
    );

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(600)).await;
        canceller.cancel();
    });

    drive(&mut session, &mut monitor, DriveConfig::default(), cancel)
        .await
        .unwrap();

    assert_eq!(*updates.lock().unwrap(), 5);
    assert_eq!(*entries.lock().unwrap(), 1);
    assert!(!session.is_running());
}

/// Cancellation before the first event: stop, let time advance, and assert
/// nothing fires.
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_driver_fires_no_callbacks() {
    // First fix only after 100ms; the pre-cancelled token wins the race.
    let source = ScriptedSource::new(vec![fix_near_p(0.0, 0)], 30, 100);

    let updates = Arc::new(Mutex::new(0usize));
    let updates_counter = Arc::clone(&updates);
    let mut session =
        LocationTrackingSession::new(TrackingOptions::default(), Box::new(source))
            .on_update(move |_| *updates_counter.lock().unwrap() += 1);

    let mut monitor = GeofenceMonitor::new(MonitorConfig {
        debounce_ms: 100,
        reentry_cooldown_ms: 1_000,
        eval_interval_ms: 20,
    });
    let entries = Arc::new(Mutex::new(0usize));
    let entries_counter = Arc::clone(&entries);
    monitor.add_zone(
        "gem-1",
        P,
        30.0,
        Some(Box::new(move |_: &str, _| {
            *entries_counter.lock().unwrap() += 1;
        })),
        None,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    drive(&mut session, &mut monitor, DriveConfig::default(), cancel)
        .await
        .unwrap();
    assert!(!session.is_running());

    // Advance past every window that could have been pending.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(*updates.lock().unwrap(), 0);
    assert_eq!(*entries.lock().unwrap(), 0);
}
