//! SQLite persistence for hook events.
//!
//! One append-mostly table plus four indexes. Each short-lived process opens
//! its own connection; the engine serializes concurrent writers. The open
//! must succeed at start-of-process — the dispatcher fails fast otherwise.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OpenFlags};
use serde_json::Value;

use crate::error::{BrainwormError, Result};

/// Strictly monotonic per-process nanosecond clock. Two events appended by
/// the same process never share a timestamp, even if the wall clock stalls.
static LAST_TIMESTAMP_NS: AtomicU64 = AtomicU64::new(0);

pub fn next_timestamp_ns() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST_TIMESTAMP_NS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_TIMESTAMP_NS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

/// Serializes with recursively sorted object keys so reader projections see
/// a stable byte representation for identical payloads.
pub fn canonical_json(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut sorted = serde_json::Map::new();
                for (key, val) in entries {
                    sorted.insert(key.clone(), sort(val));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

/// One appended row, as read back from the database.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub id: i64,
    pub session_id: Option<String>,
    pub correlation_id: Option<String>,
    pub hook_name: String,
    pub timestamp_ns: u64,
    pub execution_id: Option<String>,
    pub event_data: Value,
    pub duration_ms: Option<i64>,
}

pub struct EventStore {
    conn: Connection,
    path: PathBuf,
}

impl EventStore {
    /// Opens (creating if needed) the event database. Any failure here is an
    /// infrastructure error the caller must surface loudly.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(|err| BrainwormError::EventStoreUnavailable {
                path: path.to_path_buf(),
                details: format!("cannot create events directory: {err}"),
            })?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(path, flags).map_err(|err| {
            BrainwormError::EventStoreUnavailable {
                path: path.to_path_buf(),
                details: err.to_string(),
            }
        })?;

        let unavailable = |err: rusqlite::Error| BrainwormError::EventStoreUnavailable {
            path: path.to_path_buf(),
            details: err.to_string(),
        };

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(unavailable)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(unavailable)?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(unavailable)?;

        conn.execute_batch(
            "BEGIN;
             CREATE TABLE IF NOT EXISTS hook_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT,
                correlation_id TEXT,
                hook_name TEXT NOT NULL,
                timestamp_ns INTEGER NOT NULL,
                execution_id TEXT,
                event_data TEXT NOT NULL,
                duration_ms INTEGER
             );
             CREATE INDEX IF NOT EXISTS idx_hook_events_session
                ON hook_events (session_id);
             CREATE INDEX IF NOT EXISTS idx_hook_events_correlation
                ON hook_events (correlation_id);
             CREATE INDEX IF NOT EXISTS idx_hook_events_timestamp
                ON hook_events (timestamp_ns);
             CREATE INDEX IF NOT EXISTS idx_hook_events_hook_name
                ON hook_events (hook_name);
             COMMIT;",
        )
        .map_err(unavailable)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one event row. Durable before return (WAL + NORMAL sync).
    #[allow(clippy::too_many_arguments)]
    pub fn log(
        &self,
        hook_name: &str,
        session_id: Option<&str>,
        correlation_id: Option<&str>,
        execution_id: Option<&str>,
        event_data: &Value,
        duration_ms: Option<i64>,
    ) -> Result<i64> {
        let timestamp_ns = next_timestamp_ns();
        self.conn
            .execute(
                "INSERT INTO hook_events \
                    (session_id, correlation_id, hook_name, timestamp_ns, \
                     execution_id, event_data, duration_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session_id,
                    correlation_id,
                    hook_name,
                    timestamp_ns as i64,
                    execution_id,
                    canonical_json(event_data),
                    duration_ms,
                ],
            )
            .map_err(|err| BrainwormError::EventStoreUnavailable {
                path: self.path.clone(),
                details: format!("event append failed: {err}"),
            })?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<LoggedEvent>> {
        self.query(
            "SELECT id, session_id, correlation_id, hook_name, timestamp_ns, \
                    execution_id, event_data, duration_ms \
             FROM hook_events ORDER BY id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    /// All events for one session, oldest first.
    pub fn events_for_session(&self, session_id: &str) -> Result<Vec<LoggedEvent>> {
        self.query(
            "SELECT id, session_id, correlation_id, hook_name, timestamp_ns, \
                    execution_id, event_data, duration_ms \
             FROM hook_events WHERE session_id = ?1 ORDER BY id ASC",
            params![session_id],
        )
    }

    /// The pre/post pair (or singleton) for one tool execution.
    pub fn events_for_execution(&self, execution_id: &str) -> Result<Vec<LoggedEvent>> {
        self.query(
            "SELECT id, session_id, correlation_id, hook_name, timestamp_ns, \
                    execution_id, event_data, duration_ms \
             FROM hook_events WHERE execution_id = ?1 ORDER BY id ASC",
            params![execution_id],
        )
    }

    fn query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LoggedEvent>> {
        let map_err = |err: rusqlite::Error| BrainwormError::EventStoreUnavailable {
            path: self.path.clone(),
            details: format!("event query failed: {err}"),
        };

        let mut stmt = self.conn.prepare(sql).map_err(map_err)?;
        let rows = stmt
            .query_map(params, |row| {
                let raw: String = row.get(6)?;
                Ok(LoggedEvent {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    correlation_id: row.get(2)?,
                    hook_name: row.get(3)?,
                    timestamp_ns: row.get::<_, i64>(4)? as u64,
                    execution_id: row.get(5)?,
                    event_data: serde_json::from_str(&raw).unwrap_or(Value::Null),
                    duration_ms: row.get(7)?,
                })
            })
            .map_err(map_err)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(map_err)?);
        }
        Ok(events)
    }
}
