//! Manifest rows for avatar snapshots.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use room_archive_shared::{RoomId, UserId};

use crate::error::Result;
use crate::manifest::Manifest;
use crate::models::AvatarEntry;

impl Manifest {
    pub fn record_avatar(&self, entry: &AvatarEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO avatars (room_id, user_id, rel_path, blake3_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (room_id, user_id) DO UPDATE SET
                 rel_path = excluded.rel_path,
                 blake3_hash = excluded.blake3_hash,
                 updated_at = excluded.updated_at",
            params![
                entry.room_id.as_str(),
                entry.user_id.as_str(),
                entry.rel_path,
                entry.blake3_hash,
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn avatar(&self, room_id: &RoomId, user_id: &UserId) -> Result<Option<AvatarEntry>> {
        let entry = self
            .conn()
            .query_row(
                "SELECT room_id, user_id, rel_path, blake3_hash, updated_at
                 FROM avatars
                 WHERE room_id = ?1 AND user_id = ?2",
                params![room_id.as_str(), user_id.as_str()],
                row_to_avatar,
            )
            .optional()?;
        Ok(entry)
    }
}

fn row_to_avatar(row: &rusqlite::Row<'_>) -> rusqlite::Result<AvatarEntry> {
    let room_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let rel_path: String = row.get(2)?;
    let blake3_hash: String = row.get(3)?;
    let updated_str: String = row.get(4)?;

    let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(AvatarEntry {
        room_id: RoomId::new(room_id),
        user_id: UserId::new(user_id),
        rel_path,
        blake3_hash,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_avatar() {
        let manifest = Manifest::in_memory().unwrap();
        let room = RoomId::new("!r:example.org");
        let user = UserId::new("@a:example.org");

        let mut entry = AvatarEntry {
            room_id: room.clone(),
            user_id: user.clone(),
            rel_path: "R_avatars/@a:example.org".into(),
            blake3_hash: "old".into(),
            updated_at: Utc::now(),
        };
        manifest.record_avatar(&entry).unwrap();

        entry.blake3_hash = "new".into();
        manifest.record_avatar(&entry).unwrap();

        let stored = manifest.avatar(&room, &user).unwrap().unwrap();
        assert_eq!(stored.blake3_hash, "new");
        assert!(manifest
            .avatar(&room, &UserId::new("@b:example.org"))
            .unwrap()
            .is_none());
    }
}
