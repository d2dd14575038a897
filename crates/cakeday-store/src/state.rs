use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::init_db;
use crate::error::Result;

const LAST_TICK_KEY: &str = "last_tick";

/// Small key-value table holding engine bookkeeping that must survive a
/// restart. Currently only the last successful tick, which bounds the
/// startup recovery pass.
pub struct EngineState {
    conn: Arc<Mutex<Connection>>,
}

impl EngineState {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Instant of the last completed pass, if any run has finished before.
    pub fn last_tick(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM engine_state WHERE key = ?1",
                [LAST_TICK_KEY],
                |row| row.get(0),
            )
            .ok();
        Ok(value
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    pub fn set_last_tick(&self, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO engine_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![LAST_TICK_KEY, at.to_rfc3339()],
        )?;
        Ok(())
    }
}
