use rusqlite::Connection;

use crate::error::Result;

/// Initialise all tables for the cakeday persistence layer. Safe to call on
/// every startup — CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS birthdays (
            user_id     TEXT    NOT NULL PRIMARY KEY,
            month       INTEGER NOT NULL,
            day         INTEGER NOT NULL,
            year        INTEGER,            -- NULL when the member omitted it
            timezone    TEXT    NOT NULL DEFAULT '',
            paused      INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS announcements (
            date         TEXT NOT NULL,     -- celebration date, YYYY-MM-DD
            user_id      TEXT NOT NULL,
            path         TEXT NOT NULL,     -- hourly | daily | recovery
            announced_at TEXT NOT NULL,
            PRIMARY KEY (date, user_id)
        ) STRICT;

        -- Pruning scans by date only.
        CREATE INDEX IF NOT EXISTS idx_announcements_date ON announcements (date);

        CREATE TABLE IF NOT EXISTS engine_state (
            key   TEXT NOT NULL PRIMARY KEY,
            value TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
