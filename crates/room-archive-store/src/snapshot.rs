//! Avatar snapshot of the current room members.

use chrono::Utc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use room_archive_media::MediaResolver;
use room_archive_shared::{sanitize_component, Room};

use crate::error::Result;
use crate::files::ensure_dir;
use crate::layout::RoomLayout;
use crate::manifest::Manifest;
use crate::models::AvatarEntry;

/// Counters of one avatar pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvatarSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Save the avatar of every member that has one into the room's avatar
/// directory, one file per member named after the member id.
///
/// The directory is only created when at least one member has an avatar.
/// A file whose content hash matches the manifest and which still exists is
/// left untouched. Failures of single members are logged and counted; only
/// failing to create the avatar directory is returned as an error.
pub async fn snapshot_avatars(
    layout: &RoomLayout,
    room: &Room,
    resolver: &MediaResolver<'_>,
    manifest: &Manifest,
    cancel: &CancellationToken,
) -> Result<AvatarSummary> {
    let mut summary = AvatarSummary::default();

    let with_avatar: Vec<_> = room
        .members
        .iter()
        .filter_map(|(user, member)| member.avatar.as_ref().map(|uri| (user, uri)))
        .collect();
    if with_avatar.is_empty() {
        return Ok(summary);
    }

    let dir = layout.avatar_dir();
    ensure_dir(&dir).await?;

    for (user, uri) in with_avatar {
        if cancel.is_cancelled() {
            debug!(room = %room.id, "avatar snapshot cancelled");
            break;
        }

        let bytes = resolver.resolve_avatar(uri).await;
        if bytes.is_empty() {
            summary.failed += 1;
            continue;
        }

        let path = dir.join(sanitize_component(user.as_str(), "member"));
        let rel_path = layout.relative(&path);
        let hash = blake3::hash(&bytes).to_hex().to_string();

        let known = match manifest.avatar(&room.id, user) {
            Ok(known) => known,
            Err(e) => {
                warn!(user = %user, error = %e, "Avatar manifest lookup failed, rewriting");
                None
            }
        };
        if let Some(entry) = known {
            let present = fs::try_exists(&path).await.unwrap_or(false);
            if entry.blake3_hash == hash && entry.rel_path == rel_path && present {
                summary.unchanged += 1;
                continue;
            }
        }

        if let Err(e) = fs::write(&path, &bytes).await {
            warn!(user = %user, path = %rel_path, error = %e, "Failed to write avatar");
            summary.failed += 1;
            continue;
        }

        let entry = AvatarEntry {
            room_id: room.id.clone(),
            user_id: user.clone(),
            rel_path,
            blake3_hash: hash,
            updated_at: Utc::now(),
        };
        if let Err(e) = manifest.record_avatar(&entry) {
            warn!(user = %user, error = %e, "Failed to record avatar in manifest");
        }
        summary.written += 1;
    }

    debug!(
        room = %room.id,
        written = summary.written,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "avatar snapshot done"
    );
    Ok(summary)
}
