//! Location trail persistence.
//!
//! Append-only SQLite store of accepted location fixes, keyed by session,
//! used to reconstruct a Krawl session offline. Trail persistence is a
//! convenience side channel: it is never allowed to interrupt live
//! navigation, so every mutation on an opened store logs and absorbs
//! underlying failures instead of propagating them (construction failures
//! are still real errors; a store that never opened is a caller problem).

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default trail retention window for age-based pruning, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// One stored location sample. Never mutated after insertion; `id` is
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailSample {
    pub id: Option<i64>,
    pub session_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub timestamp_ms: i64,
}

/// SQLite-backed location trail store.
///
/// Cloning shares the underlying connection; the store is the one
/// intentionally shared resource in the pipeline and every operation except
/// [`prune_older_than`](Self::prune_older_than) is scoped by `session_id`.
#[derive(Clone)]
pub struct LocationTrailStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocationTrailStore {
    /// Open (or create) a trail database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trail_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                accuracy_m REAL,
                timestamp_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trail_session
                ON trail_samples(session_id);
            CREATE INDEX IF NOT EXISTS idx_trail_timestamp
                ON trail_samples(timestamp_ms);
            "#,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a sample. Never fails: storage errors are logged and
    /// swallowed so tracking continues uninterrupted.
    pub fn append(&self, sample: &TrailSample) {
        if let Err(err) = self.try_append(sample) {
            log::warn!(
                "[TrailStore] Failed to store sample for session {}: {}",
                sample.session_id,
                err
            );
        }
    }

    fn try_append(&self, sample: &TrailSample) -> rusqlite::Result<()> {
        self.lock().execute(
            "INSERT INTO trail_samples (session_id, latitude, longitude, accuracy_m, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sample.session_id,
                sample.latitude,
                sample.longitude,
                sample.accuracy_m,
                sample.timestamp_ms,
            ],
        )?;
        Ok(())
    }

    /// All samples for a session, unordered. Returns an empty vec on
    /// storage failure.
    pub fn get_all(&self, session_id: &str) -> Vec<TrailSample> {
        match self.try_get_all(session_id) {
            Ok(samples) => samples,
            Err(err) => {
                log::warn!(
                    "[TrailStore] Failed to read trail for session {}: {}",
                    session_id,
                    err
                );
                Vec::new()
            }
        }
    }

    fn try_get_all(&self, session_id: &str) -> rusqlite::Result<Vec<TrailSample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, latitude, longitude, accuracy_m, timestamp_ms
             FROM trail_samples WHERE session_id = ?1",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(TrailSample {
                id: row.get(0)?,
                session_id: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
                accuracy_m: row.get(4)?,
                timestamp_ms: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// Delete all samples for a session. Silent-degrade, same as `append`.
    pub fn clear(&self, session_id: &str) {
        match self
            .lock()
            .execute("DELETE FROM trail_samples WHERE session_id = ?1", params![session_id])
        {
            Ok(deleted) => {
                log::debug!("[TrailStore] Cleared {deleted} samples for session {session_id}");
            }
            Err(err) => {
                log::warn!("[TrailStore] Failed to clear session {session_id}: {err}");
            }
        }
    }

    /// Delete samples across all sessions older than `days`. Intended to
    /// run opportunistically (app start, session end), not on a schedule.
    pub fn prune_older_than(&self, days: u32) {
        let cutoff_ms = Utc::now().timestamp_millis() - i64::from(days) * 86_400_000;
        match self
            .lock()
            .execute("DELETE FROM trail_samples WHERE timestamp_ms < ?1", params![cutoff_ms])
        {
            Ok(deleted) if deleted > 0 => {
                log::info!("[TrailStore] Pruned {deleted} samples older than {days} days");
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("[TrailStore] Prune failed: {err}");
            }
        }
    }

    /// Number of samples stored for a session, or `None` on storage failure.
    pub fn count(&self, session_id: &str) -> Option<i64> {
        self.lock()
            .query_row(
                "SELECT COUNT(*) FROM trail_samples WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }
}
