//! Per-room archive writer: the record log plus the lazily created media
//! directory.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use room_archive_shared::ArchivedRecord;

use crate::error::Result;
use crate::files::{allocate_path, ensure_dir, stamp_file_times};
use crate::layout::{CollisionPolicy, LogFormat, RoomLayout};

/// Where an attachment ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub path: PathBuf,
    /// Path relative to the output root, as written into the record.
    pub rel_path: String,
}

/// Writes the log of one room.
///
/// The log is truncated on creation: every run writes a full snapshot of the
/// room history. Each record is serialized in memory before it is written and
/// the buffer is flushed after every record, so an interrupted run leaves only
/// whole records behind.
pub struct ArchiveWriter {
    layout: RoomLayout,
    format: LogFormat,
    log_path: PathBuf,
    log: BufWriter<File>,
    media_dir: Option<PathBuf>,
    records: usize,
}

impl ArchiveWriter {
    pub async fn create(layout: RoomLayout, format: LogFormat) -> Result<Self> {
        ensure_dir(layout.root()).await?;

        let log_path = layout.log_path(format);
        let file = File::create(&log_path).await?;
        tracing::debug!(path = %log_path.display(), "opened room log");

        Ok(Self {
            layout,
            format,
            log_path,
            log: BufWriter::new(file),
            media_dir: None,
            records: 0,
        })
    }

    pub fn layout(&self) -> &RoomLayout {
        &self.layout
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    async fn media_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.media_dir {
            return Ok(dir.clone());
        }
        let dir = self.layout.media_dir();
        ensure_dir(&dir).await?;
        self.media_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Write attachment bytes into the media directory and stamp the file
    /// with the event time.
    pub async fn store_media(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        timestamp_ms: u64,
        policy: CollisionPolicy,
    ) -> Result<StoredMedia> {
        let base = self.media_dir().await?.join(file_name);
        let path = match policy {
            CollisionPolicy::Overwrite => base,
            CollisionPolicy::Duplicate | CollisionPolicy::SkipExisting => allocate_path(&base).await?,
        };

        fs::write(&path, bytes).await?;
        stamp_file_times(&path, timestamp_ms).await?;

        let rel_path = self.layout.relative(&path);
        tracing::debug!(path = %rel_path, size = bytes.len(), "stored attachment");
        Ok(StoredMedia { path, rel_path })
    }

    /// Append one record to the log.
    pub async fn append(&mut self, record: &ArchivedRecord) -> Result<()> {
        let chunk = match self.format {
            LogFormat::Json => {
                let mut line = serde_json::to_string(record)?;
                line.push('\n');
                line
            }
            LogFormat::Yaml => serde_yaml::to_string(std::slice::from_ref(record))?,
        };

        self.log.write_all(chunk.as_bytes()).await?;
        self.log.flush().await?;
        self.records += 1;
        Ok(())
    }

    /// Flush and close the log, returning the number of records written.
    pub async fn finish(mut self) -> Result<usize> {
        self.log.flush().await?;
        self.log.into_inner().sync_all().await?;
        tracing::info!(
            path = %self.log_path.display(),
            records = self.records,
            "room log complete"
        );
        Ok(self.records)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use room_archive_shared::{EventId, RecordKind, Room, RoomId, UserId};

    use super::*;

    fn record(id: &str, kind: RecordKind) -> ArchivedRecord {
        ArchivedRecord {
            event_id: EventId::new(id),
            sender_id: UserId::new("@alice:example.org"),
            sender_name: "Alice <@alice:example.org>".into(),
            timestamp: 1_600_000_000_000,
            kind,
        }
    }

    fn layout(root: &Path) -> RoomLayout {
        RoomLayout::new(root, &Room::new(RoomId::new("!r:example.org"), "General"))
    }

    #[tokio::test]
    async fn test_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(layout(dir.path()), LogFormat::Json).await.unwrap();

        writer.append(&record("$1", RecordKind::Text { body: "hi".into() })).await.unwrap();
        writer.append(&record("$2", RecordKind::Redacted)).await.unwrap();
        let path = writer.log_path().to_path_buf();
        assert_eq!(writer.finish().await.unwrap(), 2);

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ArchivedRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event_id.as_str(), "$1");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["type"], "redacted");
        assert!(second.get("body").is_none());
    }

    #[tokio::test]
    async fn test_yaml_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(layout(dir.path()), LogFormat::Yaml).await.unwrap();

        writer.append(&record("$1", RecordKind::Text { body: "hi".into() })).await.unwrap();
        writer
            .append(&record("$2", RecordKind::Media { src: "x_media/a.png".into() }))
            .await
            .unwrap();
        let path = writer.log_path().to_path_buf();
        writer.finish().await.unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<ArchivedRecord> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].kind, RecordKind::Media { src: "x_media/a.png".into() });
    }

    #[tokio::test]
    async fn test_log_is_truncated_per_run() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..2 {
            let mut writer = ArchiveWriter::create(layout(dir.path()), LogFormat::Json).await.unwrap();
            writer.append(&record("$1", RecordKind::Text { body: "hi".into() })).await.unwrap();
            writer.finish().await.unwrap();
        }
        let text = std::fs::read_to_string(layout(dir.path()).log_path(LogFormat::Json)).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_store_media_policies() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ArchiveWriter::create(layout(dir.path()), LogFormat::Json).await.unwrap();

        let first = writer
            .store_media("cat.png", b"one", 1_600_000_000_000, CollisionPolicy::Duplicate)
            .await
            .unwrap();
        let second = writer
            .store_media("cat.png", b"two", 1_600_000_000_000, CollisionPolicy::Duplicate)
            .await
            .unwrap();
        assert_eq!(first.rel_path, "General_!r:example.org_media/cat.png");
        assert_eq!(second.rel_path, "General_!r:example.org_media/cat(1).png");

        let third = writer
            .store_media("cat.png", b"three", 1_700_000_000_000, CollisionPolicy::Overwrite)
            .await
            .unwrap();
        assert_eq!(third.path, first.path);
        assert_eq!(std::fs::read(&first.path).unwrap(), b"three");

        let modified = std::fs::metadata(&third.path).unwrap().modified().unwrap();
        assert_eq!(modified, UNIX_EPOCH + Duration::from_millis(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_no_media_dir_without_media() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let mut writer = ArchiveWriter::create(layout.clone(), LogFormat::Json).await.unwrap();
        writer.append(&record("$1", RecordKind::Text { body: "hi".into() })).await.unwrap();
        writer.finish().await.unwrap();

        assert!(!layout.media_dir().exists());
    }
}
