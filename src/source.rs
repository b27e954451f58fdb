//! OS continuous-location-stream collaborator contract.
//!
//! The core never talks to a platform location API directly. The embedding
//! app implements [`LocationSource`] over whatever the platform provides
//! (browser `watchPosition`, CoreLocation, FusedLocationProvider) and the
//! tracking session consumes the resulting event stream. Tests implement it
//! over a plain channel.

use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::{LocationFix, NavError};

/// Subscription tuning passed through to the platform API.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Request the high-accuracy (GPS) pipeline rather than coarse
    /// network positioning.
    pub high_accuracy: bool,
    /// How long the platform may wait for a fix before reporting a
    /// timeout, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 5_000,
        }
    }
}

/// One event from the location stream.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A raw fix. Delivered in the order the platform produced them.
    Fix(LocationFix),
    /// A stream-level failure. [`NavError::PermissionDenied`] must be
    /// distinguishable from other failures so the UI can prompt.
    Error(NavError),
}

/// A continuous location stream.
///
/// `subscribe` starts delivery of [`SourceEvent`]s into `events` and
/// returns synchronously; failures that prevent the subscription from being
/// established at all (permission already denied, unsupported platform) are
/// returned as `Err`. `unsubscribe` stops delivery and must be safe to call
/// when not subscribed; after it returns, the implementation must not send
/// further events.
pub trait LocationSource: Send {
    fn subscribe(
        &mut self,
        options: &SubscribeOptions,
        events: UnboundedSender<SourceEvent>,
    ) -> Result<()>;

    fn unsubscribe(&mut self);
}
