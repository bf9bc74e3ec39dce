//! v001 -- Initial schema creation.
//!
//! Creates the three manifest tables: `media_files`, `avatars` and `runs`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Stored attachments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS media_files (
    room_id     TEXT NOT NULL,
    event_id    TEXT NOT NULL,
    rel_path    TEXT NOT NULL,                -- relative to the output root
    file_size   INTEGER NOT NULL,
    blake3_hash TEXT NOT NULL,
    stored_at   TEXT NOT NULL,                -- RFC-3339

    PRIMARY KEY (room_id, event_id)
);

-- ----------------------------------------------------------------
-- Avatar snapshots
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS avatars (
    room_id     TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    rel_path    TEXT NOT NULL,
    blake3_hash TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    PRIMARY KEY (room_id, user_id)
);

-- ----------------------------------------------------------------
-- Archive runs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS runs (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    room_id         TEXT NOT NULL,
    started_at      TEXT NOT NULL,
    finished_at     TEXT,
    records_written INTEGER NOT NULL DEFAULT 0,
    events_ignored  INTEGER NOT NULL DEFAULT 0,
    events_failed   INTEGER NOT NULL DEFAULT 0,
    interrupted     INTEGER NOT NULL DEFAULT 0  -- boolean 0/1
);

CREATE INDEX IF NOT EXISTS idx_runs_room_started
    ON runs(room_id, started_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
