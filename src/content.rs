//! Stop content reveal state machine.
//!
//! When the geofence monitor confirms an arrival, the matching waypoint's
//! pre-fetched content is revealed exactly once as a Stop Detail Card. The
//! controller owns the card's visibility state and the in-memory content
//! cache; it does not own visited-bookkeeping. Checking off or skipping a
//! stop is recorded by the session layer, which also decides whether the
//! zone should be re-armed (`GeofenceMonitor::reset_trigger`) or removed.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

/// Content for one waypoint, loaded once at session start and read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointContent {
    pub waypoint_id: String,
    pub name: String,
    pub category: String,
    pub creator_note: String,
    pub lokal_secret: String,
    pub thumbnail_url: Option<String>,
}

/// Visibility state of the Stop Detail Card. One per active session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopContentState {
    pub visible: bool,
    /// The waypoint the card is (or was last) showing. Kept through a
    /// dismiss so the UI can still reference it.
    pub current_waypoint_id: Option<String>,
    pub dismissed: bool,
}

/// Reveal/dismiss state machine over [`StopContentState`].
#[derive(Default)]
pub struct StopContentController {
    state: StopContentState,
    content: HashMap<String, WaypointContent>,
}

impl StopContentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the pre-fetched content map. Called once at session start;
    /// replaces any previous map.
    pub fn preload(&mut self, items: Vec<WaypointContent>) {
        self.content = items
            .into_iter()
            .map(|item| (item.waypoint_id.clone(), item))
            .collect();
        debug!("[StopContent] Preloaded {} waypoints", self.content.len());
    }

    /// Content for a waypoint. `None` means the waypoint was never
    /// pre-fetched, which is an empty state, not an error; the card renders
    /// without content for that id.
    pub fn content(&self, waypoint_id: &str) -> Option<&WaypointContent> {
        self.content.get(waypoint_id)
    }

    /// React to a confirmed geofence entry: reveal the card for the
    /// arriving waypoint. Unconditional: a later entry overrides a card
    /// still visible for a different waypoint (last entry wins).
    pub fn on_geofence_entry(&mut self, waypoint_id: &str) {
        if let Some(previous) = self.state.current_waypoint_id.as_deref() {
            if self.state.visible && previous != waypoint_id {
                debug!("[StopContent] {previous} card replaced by {waypoint_id}");
            }
        }
        self.state = StopContentState {
            visible: true,
            current_waypoint_id: Some(waypoint_id.to_string()),
            dismissed: false,
        };
    }

    /// Hide the card, keeping the waypoint id for reference.
    pub fn dismiss(&mut self) {
        self.state.visible = false;
        self.state.dismissed = true;
    }

    /// Record that the user checked off the currently shown stop. Returns
    /// false when `waypoint_id` is not the card being shown (stale UI
    /// event). Visited-bookkeeping belongs to the caller; follow with
    /// [`dismiss`](Self::dismiss).
    pub fn check_off(&mut self, waypoint_id: &str) -> bool {
        self.current_card_matches(waypoint_id, "check-off")
    }

    /// Record that the user skipped the currently shown stop. Same contract
    /// as [`check_off`](Self::check_off); the caller additionally resets or
    /// removes the zone so the card does not re-open.
    pub fn skip(&mut self, waypoint_id: &str) -> bool {
        self.current_card_matches(waypoint_id, "skip")
    }

    fn current_card_matches(&self, waypoint_id: &str, action: &str) -> bool {
        let matches = self.state.current_waypoint_id.as_deref() == Some(waypoint_id);
        if !matches {
            debug!(
                "[StopContent] Ignored {action} for {waypoint_id}; current card is {:?}",
                self.state.current_waypoint_id
            );
        }
        matches
    }

    pub fn state(&self) -> &StopContentState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    /// Reset to the initial state and drop the content cache. Called when
    /// the session ends.
    pub fn clear(&mut self) {
        self.state = StopContentState::default();
        self.content.clear();
    }
}
