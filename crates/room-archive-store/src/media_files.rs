//! Manifest rows for stored attachments.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use room_archive_shared::{EventId, RoomId};

use crate::error::Result;
use crate::manifest::Manifest;
use crate::models::MediaFile;

impl Manifest {
    /// Insert or replace the file recorded for an event.
    pub fn record_media_file(&self, file: &MediaFile) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO media_files (room_id, event_id, rel_path, file_size, blake3_hash, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.room_id.as_str(),
                file.event_id.as_str(),
                file.rel_path,
                file.file_size,
                file.blake3_hash,
                file.stored_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn media_file(&self, room_id: &RoomId, event_id: &EventId) -> Result<Option<MediaFile>> {
        let file = self
            .conn()
            .query_row(
                "SELECT room_id, event_id, rel_path, file_size, blake3_hash, stored_at
                 FROM media_files
                 WHERE room_id = ?1 AND event_id = ?2",
                params![room_id.as_str(), event_id.as_str()],
                row_to_media_file,
            )
            .optional()?;
        Ok(file)
    }
}

fn row_to_media_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaFile> {
    let room_id: String = row.get(0)?;
    let event_id: String = row.get(1)?;
    let rel_path: String = row.get(2)?;
    let file_size: i64 = row.get(3)?;
    let blake3_hash: String = row.get(4)?;
    let stored_str: String = row.get(5)?;

    let stored_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&stored_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(MediaFile {
        room_id: RoomId::new(room_id),
        event_id: EventId::new(event_id),
        rel_path,
        file_size,
        blake3_hash,
        stored_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(event: &str, path: &str) -> MediaFile {
        MediaFile {
            room_id: RoomId::new("!r:example.org"),
            event_id: EventId::new(event),
            rel_path: path.into(),
            file_size: 3,
            blake3_hash: blake3::hash(b"abc").to_hex().to_string(),
            stored_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_lookup() {
        let manifest = Manifest::in_memory().unwrap();
        let room = RoomId::new("!r:example.org");

        manifest.record_media_file(&file("$1", "R_media/a.png")).unwrap();

        let found = manifest.media_file(&room, &EventId::new("$1")).unwrap().unwrap();
        assert_eq!(found.rel_path, "R_media/a.png");
        assert!(manifest.media_file(&room, &EventId::new("$2")).unwrap().is_none());
    }

    #[test]
    fn test_replace_keeps_one_row() {
        let manifest = Manifest::in_memory().unwrap();
        let room = RoomId::new("!r:example.org");

        manifest.record_media_file(&file("$1", "R_media/a.png")).unwrap();
        manifest.record_media_file(&file("$1", "R_media/a(1).png")).unwrap();

        let found = manifest.media_file(&room, &EventId::new("$1")).unwrap().unwrap();
        assert_eq!(found.rel_path, "R_media/a(1).png");
    }
}
