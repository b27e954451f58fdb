//! Unified error handling for the navigation core.
//!
//! Only sensor-level failures cross the crate boundary as errors, because
//! the UI can act on them (prompt to enable location, retry, fall back to a
//! static map). Data-quality rejections, trail persistence failures, and
//! missing pre-fetched content are absorbed and reflected as state instead;
//! see the individual modules for those policies.

use thiserror::Error;

/// Unified error type for navigation-core operations.
#[derive(Debug, Clone, Error)]
pub enum NavError {
    /// The user denied the location permission. The UI decides remediation.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform has no usable location API.
    #[error("location is not supported on this device")]
    Unsupported,

    /// The location source could not produce a fix.
    #[error("position unavailable: {message}")]
    PositionUnavailable { message: String },

    /// No fix arrived within the subscription's timeout.
    #[error("location request timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// Trail store failure. Internal only: the public trail API absorbs
    /// these and degrades silently, so callers never observe this variant
    /// from [`crate::LocationTrailStore`] methods other than `open`.
    #[error("trail persistence error: {message}")]
    Persistence { message: String },

    /// The tracking session was asked to start while already running.
    #[error("tracking session already started")]
    AlreadyStarted,
}

impl NavError {
    /// True for errors the UI should answer with a permission prompt.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, NavError::PermissionDenied)
    }
}

impl From<rusqlite::Error> for NavError {
    fn from(err: rusqlite::Error) -> Self {
        NavError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for navigation-core operations.
pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NavError::Timeout { waited_ms: 5000 };
        assert!(err.to_string().contains("5000ms"));

        let err = NavError::PositionUnavailable {
            message: "no satellites".to_string(),
        };
        assert!(err.to_string().contains("no satellites"));
    }

    #[test]
    fn test_permission_predicate() {
        assert!(NavError::PermissionDenied.is_permission_denied());
        assert!(!NavError::Unsupported.is_permission_denied());
    }
}
