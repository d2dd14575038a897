use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::db::init_db;
use crate::error::Result;
use crate::types::DetectionPath;

/// The announcement ledger: which members have been celebrated on which
/// dates. Shared by every detection path — a (date, user) pair present here
/// is never announced again, no matter which driver asks.
///
/// Entries are written only after a dispatch succeeds, all members of a batch
/// in one transaction, so a crash can never leave a member marked as
/// announced without the message having gone out.
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
}

impl Ledger {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn is_announced(&self, date: NaiveDate, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM announcements WHERE date = ?1 AND user_id = ?2",
            rusqlite::params![date.to_string(), user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// User ids already announced for `date`, ascending.
    pub fn announced_on(&self, date: NaiveDate) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT user_id FROM announcements WHERE date = ?1 ORDER BY user_id")?;
        let users = stmt
            .query_map([date.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }

    /// Record every member of a dispatched batch in a single transaction.
    ///
    /// INSERT OR IGNORE tolerates a partial earlier write: a user committed
    /// by a crashed run stays committed, the rest are filled in.
    pub fn commit(&self, date: NaiveDate, user_ids: &[String], path: DetectionPath) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        for user_id in user_ids {
            tx.execute(
                "INSERT OR IGNORE INTO announcements (date, user_id, path, announced_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![date.to_string(), user_id, path.to_string(), now],
            )?;
        }
        tx.commit()?;
        info!(date = %date, count = user_ids.len(), %path, "announcements committed");
        Ok(())
    }

    /// Delete entries for dates strictly before `older_than`. Returns the
    /// number of rows removed.
    pub fn prune(&self, older_than: NaiveDate) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM announcements WHERE date < ?1",
            [older_than.to_string()],
        )?;
        if n > 0 {
            info!(cutoff = %older_than, removed = n, "old announcements pruned");
        }
        Ok(n)
    }
}
