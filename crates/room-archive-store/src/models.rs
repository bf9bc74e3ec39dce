//! Rows of the run manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use room_archive_shared::{EventId, RoomId, UserId};

// ---------------------------------------------------------------------------
// MediaFile
// ---------------------------------------------------------------------------

/// An attachment written to disk by some run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaFile {
    pub room_id: RoomId,
    pub event_id: EventId,
    /// Location relative to the output root, `/`-separated.
    pub rel_path: String,
    pub file_size: i64,
    /// BLAKE3 hash of the stored (decrypted) bytes, hex.
    pub blake3_hash: String,
    pub stored_at: DateTime<Utc>,
}

impl MediaFile {
    /// Describe `bytes` just written to `rel_path` for an event.
    pub fn stored_now(room_id: RoomId, event_id: EventId, rel_path: String, bytes: &[u8]) -> Self {
        Self {
            room_id,
            event_id,
            rel_path,
            file_size: bytes.len() as i64,
            blake3_hash: blake3::hash(bytes).to_hex().to_string(),
            stored_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// AvatarEntry
// ---------------------------------------------------------------------------

/// Last avatar snapshot written for a member of a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvatarEntry {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub rel_path: String,
    pub blake3_hash: String,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// One archive pass over one room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    pub id: Uuid,
    pub room_id: RoomId,
    pub started_at: DateTime<Utc>,
    /// `None` while the run is in progress or if it crashed.
    pub finished_at: Option<DateTime<Utc>>,
    pub records_written: i64,
    pub events_ignored: i64,
    pub events_failed: i64,
    pub interrupted: bool,
}

impl RunRecord {
    pub fn start(room_id: RoomId) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            started_at: Utc::now(),
            finished_at: None,
            records_written: 0,
            events_ignored: 0,
            events_failed: 0,
            interrupted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_json_roundtrip() {
        let mut run = RunRecord::start(RoomId::new("!r:example.org"));
        run.records_written = 3;
        run.interrupted = true;

        let json = serde_json::to_string(&run).unwrap();
        let back: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
        assert!(json.contains(&run.id.to_string()));
    }

    #[test]
    fn test_media_file_describes_bytes() {
        let file = MediaFile::stored_now(
            RoomId::new("!r:example.org"),
            EventId::new("$m"),
            "General_!r:example.org_media/cat.png".into(),
            b"meow",
        );
        assert_eq!(file.file_size, 4);
        assert_eq!(file.blake3_hash, blake3::hash(b"meow").to_hex().to_string());
    }
}
