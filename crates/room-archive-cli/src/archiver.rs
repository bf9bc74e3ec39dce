//! Per-room archive pass: anchor, merged history, classification, media
//! resolution and the record log.

use std::path::Path;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use room_archive_media::MediaResolver;
use room_archive_net::{merged_history, Session};
use room_archive_shared::{classify, ArchivedRecord, EventClass, MediaReference, RawEvent, RecordKind, Room, RoomId};
use room_archive_store::{
    snapshot_avatars, ArchiveWriter, AvatarSummary, CollisionPolicy, LogFormat, Manifest, MediaFile, RoomLayout,
};

use crate::error::ArchiveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub download_media: bool,
    pub collision: CollisionPolicy,
    pub log_format: LogFormat,
}

/// Outcome of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub written: usize,
    pub ignored: usize,
    pub failed: usize,
    pub avatars: AvatarSummary,
    pub interrupted: bool,
}

impl RoomSummary {
    fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            written: 0,
            ignored: 0,
            failed: 0,
            avatars: AvatarSummary::default(),
            interrupted: false,
        }
    }
}

/// Archives rooms one at a time into a single output root.
pub struct RoomArchiver<'a> {
    session: &'a dyn Session,
    manifest: &'a Manifest,
    output_root: &'a Path,
    options: ArchiveOptions,
    cancel: CancellationToken,
}

impl<'a> RoomArchiver<'a> {
    pub fn new(
        session: &'a dyn Session,
        manifest: &'a Manifest,
        output_root: &'a Path,
        options: ArchiveOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            manifest,
            output_root,
            options,
            cancel,
        }
    }

    /// Archive each room in turn. A failing room is logged and skipped;
    /// an interrupt stops before the next room.
    pub async fn archive_rooms(&self, rooms: &[Room]) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(rooms.len());

        for room in rooms {
            if self.cancel.is_cancelled() {
                break;
            }

            info!(room = %room.id, name = %room.display_name, "Archiving room");
            match self.archive_room(room).await {
                Ok(summary) => {
                    info!(
                        room = %summary.room_id,
                        written = summary.written,
                        ignored = summary.ignored,
                        failed = summary.failed,
                        avatars = summary.avatars.written + summary.avatars.unchanged,
                        interrupted = summary.interrupted,
                        "Room done"
                    );
                    summaries.push(summary);
                }
                Err(e) => error!(room = %room.id, error = %e, "Room failed, continuing with the next one"),
            }
        }

        summaries
    }

    pub async fn archive_room(&self, room: &Room) -> Result<RoomSummary, ArchiveError> {
        let anchor = self.session.sync_anchor(&room.id).await?;
        let history = merged_history(self.session, &room.id, &anchor, &self.cancel).await;

        let layout = RoomLayout::new(self.output_root, room);
        let mut writer = ArchiveWriter::create(layout.clone(), self.options.log_format).await?;
        let mut run = self.manifest.begin_run(&room.id)?;
        let resolver = MediaResolver::new(self.session);

        let mut summary = RoomSummary::new(room.id.clone());
        summary.interrupted = history.cancelled();

        for event in &history.events {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let kind = match classify(event, self.options.download_media) {
                EventClass::Text { body } => RecordKind::Text { body },
                EventClass::Redacted => RecordKind::Redacted,
                EventClass::Ignored => {
                    summary.ignored += 1;
                    continue;
                }
                EventClass::Media { reference, body } => {
                    match self.archive_media(&mut writer, room, event, &reference, &body, &resolver).await {
                        Some(src) => RecordKind::Media { src },
                        None => {
                            summary.failed += 1;
                            continue;
                        }
                    }
                }
            };

            writer
                .append(&ArchivedRecord {
                    event_id: event.event_id.clone(),
                    sender_id: event.sender.clone(),
                    sender_name: room.sender_name(&event.sender),
                    timestamp: event.origin_server_ts,
                    kind,
                })
                .await?;
        }

        summary.written = writer.finish().await?;

        if self.cancel.is_cancelled() {
            summary.interrupted = true;
        } else {
            match snapshot_avatars(&layout, room, &resolver, self.manifest, &self.cancel).await {
                Ok(avatars) => {
                    summary.avatars = avatars;
                    summary.failed += avatars.failed;
                }
                Err(e) => error!(room = %room.id, error = %e, "Avatar snapshot failed"),
            }
        }

        run.records_written = summary.written as i64;
        run.events_ignored = summary.ignored as i64;
        run.events_failed = summary.failed as i64;
        run.interrupted = summary.interrupted;
        self.manifest.finish_run(&mut run)?;

        Ok(summary)
    }

    /// Store the attachment of a media event and return its path relative
    /// to the output root, or `None` when the event has to be dropped.
    /// Failures stay with this event.
    async fn archive_media(
        &self,
        writer: &mut ArchiveWriter,
        room: &Room,
        event: &RawEvent,
        reference: &MediaReference,
        body: &str,
        resolver: &MediaResolver<'_>,
    ) -> Option<String> {
        if self.options.collision == CollisionPolicy::SkipExisting {
            match self.manifest.media_file(&room.id, &event.event_id) {
                Ok(Some(known)) => {
                    let path = writer.layout().resolve(&known.rel_path);
                    if fs::try_exists(&path).await.unwrap_or(false) {
                        debug!(room = %room.id, event = %event.event_id, path = %known.rel_path, "Reusing stored attachment");
                        return Some(known.rel_path);
                    }
                    warn!(room = %room.id, event = %event.event_id, path = %known.rel_path, "Stored attachment is gone, downloading again");
                }
                Ok(None) => {}
                Err(e) => warn!(room = %room.id, event = %event.event_id, error = %e, "Manifest lookup failed, downloading again"),
            }
        }

        let media = match resolver.resolve(reference, body).await {
            Ok(media) => media,
            Err(e) => {
                error!(room = %room.id, event = %event.event_id, error = %e, "Dropping media event");
                return None;
            }
        };

        let stored = match writer
            .store_media(&media.file_name, &media.bytes, event.origin_server_ts, self.options.collision)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                error!(room = %room.id, event = %event.event_id, error = %e, "Failed to store attachment, dropping media event");
                return None;
            }
        };

        // The file is on disk; a missing manifest row only costs a re-download later
        if let Err(e) = self.manifest.record_media_file(&MediaFile::stored_now(
            room.id.clone(),
            event.event_id.clone(),
            stored.rel_path.clone(),
            &media.bytes,
        )) {
            warn!(room = %room.id, event = %event.event_id, error = %e, "Failed to record attachment in manifest");
        }

        Some(stored.rel_path)
    }
}
