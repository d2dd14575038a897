use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use cakeday_core::Anniversary;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::AnniversaryRecord;

/// Map a SELECT row (column order from RECORD_SELECT) to an AnniversaryRecord.
/// Centralised here so every query in this crate stays consistent.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnniversaryRecord> {
    Ok(AnniversaryRecord {
        user_id: row.get(0)?,
        anniversary: Anniversary {
            month: row.get(1)?,
            day: row.get(2)?,
            year: row.get(3)?,
        },
        timezone: row.get(4)?,
        paused: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const RECORD_SELECT: &str =
    "SELECT user_id, month, day, year, timezone, paused, created_at, updated_at FROM birthdays";

/// Anniversary records, one per member.
///
/// Thread-safe: wraps its own SQLite connection in a Mutex so user-facing
/// commands can write while the engine reads on another task.
pub struct BirthdayStore {
    conn: Arc<Mutex<Connection>>,
}

impl BirthdayStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace a member's record. The anniversary is validated
    /// before any write; an invalid one never reaches the table.
    pub fn upsert(
        &self,
        user_id: &str,
        anniversary: Anniversary,
        timezone: &str,
    ) -> Result<AnniversaryRecord> {
        let anniversary =
            Anniversary::new(anniversary.month, anniversary.day, anniversary.year)?;
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO birthdays (user_id, month, day, year, timezone, paused, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                month = excluded.month,
                day = excluded.day,
                year = excluded.year,
                timezone = excluded.timezone,
                updated_at = excluded.updated_at",
            rusqlite::params![
                user_id,
                anniversary.month,
                anniversary.day,
                anniversary.year,
                timezone,
                now
            ],
        )?;
        info!(%user_id, date = %anniversary, "birthday saved");
        self.get_locked(&conn, user_id)
    }

    /// Remove a member's record. Returns `NotFound` if no row is deleted.
    pub fn remove(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM birthdays WHERE user_id = ?1", [user_id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                user_id: user_id.to_string(),
            });
        }
        info!(%user_id, "birthday removed");
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Result<AnniversaryRecord> {
        let conn = self.conn.lock().unwrap();
        self.get_locked(&conn, user_id)
    }

    fn get_locked(&self, conn: &Connection, user_id: &str) -> Result<AnniversaryRecord> {
        conn.query_row(
            &format!("{RECORD_SELECT} WHERE user_id = ?1"),
            [user_id],
            row_to_record,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                user_id: user_id.to_string(),
            },
            other => StoreError::Database(other),
        })
    }

    /// All unpaused records, ordered by user id for deterministic batches.
    pub fn list_active(&self) -> Result<Vec<AnniversaryRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{RECORD_SELECT} WHERE paused = 0 ORDER BY user_id"))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Pause or unpause a member without touching the stored date.
    pub fn set_paused(&self, user_id: &str, paused: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE birthdays SET paused = ?1, updated_at = ?2 WHERE user_id = ?3",
            rusqlite::params![paused as i64, now, user_id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                user_id: user_id.to_string(),
            });
        }
        info!(%user_id, paused, "birthday pause flag updated");
        Ok(())
    }
}
