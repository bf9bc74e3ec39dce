//! Manifest rows for archive runs.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use room_archive_shared::RoomId;

use crate::error::Result;
use crate::manifest::Manifest;
use crate::models::RunRecord;

impl Manifest {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Record the start of a run.
    pub fn begin_run(&self, room_id: &RoomId) -> Result<RunRecord> {
        let run = RunRecord::start(room_id.clone());
        self.conn().execute(
            "INSERT INTO runs (id, room_id, started_at) VALUES (?1, ?2, ?3)",
            params![run.id.to_string(), run.room_id.as_str(), run.started_at.to_rfc3339()],
        )?;
        Ok(run)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Store the final counters of a run and stamp its end time.
    pub fn finish_run(&self, run: &mut RunRecord) -> Result<()> {
        let finished_at = Utc::now();
        self.conn().execute(
            "UPDATE runs
             SET finished_at = ?2, records_written = ?3, events_ignored = ?4,
                 events_failed = ?5, interrupted = ?6
             WHERE id = ?1",
            params![
                run.id.to_string(),
                finished_at.to_rfc3339(),
                run.records_written,
                run.events_ignored,
                run.events_failed,
                run.interrupted as i32,
            ],
        )?;
        run.finished_at = Some(finished_at);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Most recent finished run of a room.
    pub fn last_finished_run(&self, room_id: &RoomId) -> Result<Option<RunRecord>> {
        let run = self
            .conn()
            .query_row(
                "SELECT id, room_id, started_at, finished_at, records_written,
                        events_ignored, events_failed, interrupted
                 FROM runs
                 WHERE room_id = ?1 AND finished_at IS NOT NULL
                 ORDER BY started_at DESC
                 LIMIT 1",
                params![room_id.as_str()],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let id_str: String = row.get(0)?;
    let room_id: String = row.get(1)?;
    let started_str: String = row.get(2)?;
    let finished_str: Option<String> = row.get(3)?;
    let interrupted_int: i32 = row.get(7)?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(RunRecord {
        id,
        room_id: RoomId::new(room_id),
        started_at: parse_time(2, &started_str)?,
        finished_at: finished_str.as_deref().map(|s| parse_time(3, s)).transpose()?,
        records_written: row.get(4)?,
        events_ignored: row.get(5)?,
        events_failed: row.get(6)?,
        interrupted: interrupted_int != 0,
    })
}
