//! History pagination.
//!
//! Both directions start from the same sync anchor. Backward pages arrive
//! newest first, so the backward run is reversed before the forward run is
//! appended, giving one oldest-first sequence around the anchor.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use room_archive_shared::constants::PAGE_SIZE;
use room_archive_shared::{RawEvent, RoomId};

use crate::error::NetError;
use crate::session::{Direction, PaginationCursor, Session, SyncAnchor};

/// Everything fetched in one direction, in arrival order.
#[derive(Debug)]
pub struct DirectionFetch {
    pub events: Vec<RawEvent>,
    pub pages: usize,
    /// Transport error that ended this direction early.
    pub error: Option<NetError>,
    pub cancelled: bool,
}

impl DirectionFetch {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            pages: 0,
            error: None,
            cancelled: false,
        }
    }
}

/// Merged room history, oldest first.
#[derive(Debug)]
pub struct MergedHistory {
    pub events: Vec<RawEvent>,
    pub backward: DirectionFetch,
    pub forward: DirectionFetch,
}

impl MergedHistory {
    pub fn cancelled(&self) -> bool {
        self.backward.cancelled || self.forward.cancelled
    }
}

/// Page through one direction until an empty page, a transport error or a
/// cancellation. Errors end this direction only.
pub async fn fetch_direction(
    session: &dyn Session,
    room: &RoomId,
    anchor: &SyncAnchor,
    direction: Direction,
    cancel: &CancellationToken,
) -> DirectionFetch {
    let mut cursor = PaginationCursor::new(anchor.prev_batch.clone(), direction);
    let mut fetch = DirectionFetch::new();

    loop {
        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                fetch.cancelled = true;
                break;
            }
            page = session.fetch_page(room, &cursor, PAGE_SIZE) => page,
        };

        let page = match page {
            Ok(page) => page,
            Err(e) => {
                warn!(room = %room, %direction, pages = fetch.pages, error = %e, "History fetch failed, ending direction");
                fetch.error = Some(e);
                break;
            }
        };

        if page.fetched == 0 {
            break;
        }

        fetch.pages += 1;
        fetch.events.extend(page.events);
        debug!(room = %room, %direction, total = fetch.events.len(), "Fetched history page");

        match page.next {
            Some(next) if next != cursor.token => cursor.advance(next),
            _ => break,
        }
    }

    fetch
}

/// Fetch the full available history of a room around `anchor`.
pub async fn merged_history(
    session: &dyn Session,
    room: &RoomId,
    anchor: &SyncAnchor,
    cancel: &CancellationToken,
) -> MergedHistory {
    let mut backward = fetch_direction(session, room, anchor, Direction::Backward, cancel).await;

    let mut forward = if backward.cancelled {
        let mut skipped = DirectionFetch::new();
        skipped.cancelled = true;
        skipped
    } else {
        fetch_direction(session, room, anchor, Direction::Forward, cancel).await
    };

    let mut events = std::mem::take(&mut backward.events);
    events.reverse();
    events.append(&mut forward.events);

    info!(
        room = %room,
        backward_pages = backward.pages,
        forward_pages = forward.pages,
        events = events.len(),
        "Room history fetched"
    );

    MergedHistory {
        events,
        backward,
        forward,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use room_archive_shared::{ContentUri, Room};

    use super::*;
    use crate::memory::MemorySession;
    use crate::session::Page;

    fn text(id: &str, ts: u64) -> RawEvent {
        serde_json::from_value(json!({
            "event_id": id,
            "sender": "@a:example.org",
            "origin_server_ts": ts,
            "type": "m.room.message",
            "content": { "msgtype": "m.text", "body": id },
        }))
        .unwrap()
    }

    fn ids(events: &[RawEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_id.as_str()).collect()
    }

    fn room() -> Room {
        Room::new(RoomId::new("!r:example.org"), "General")
    }

    async fn merge(session: &MemorySession) -> MergedHistory {
        let room = room();
        let anchor = session.sync_anchor(&room.id).await.unwrap();
        merged_history(session, &room.id, &anchor, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_history_around_anchor() {
        let session = MemorySession::new().with_room(
            room(),
            vec![text("T1", 1), text("T2", 2), text("T3", 3)],
            vec![text("T4", 4), text("T5", 5)],
        );

        let merged = merge(&session).await;
        assert_eq!(ids(&merged.events), ["T1", "T2", "T3", "T4", "T5"]);
        assert!(merged.backward.error.is_none());
        assert!(merged.forward.error.is_none());
    }

    #[tokio::test]
    async fn test_multiple_pages_keep_order() {
        let history: Vec<_> = (0..2500).map(|i| text(&format!("h{i}"), i)).collect();
        let future: Vec<_> = (0..1200).map(|i| text(&format!("f{i}"), 10_000 + i)).collect();
        let session = MemorySession::new().with_room(room(), history, future);

        let merged = merge(&session).await;
        assert_eq!(merged.events.len(), 3700);
        assert_eq!(merged.backward.pages, 3);
        assert_eq!(merged.forward.pages, 2);
        assert!(merged
            .events
            .windows(2)
            .all(|w| w[0].origin_server_ts < w[1].origin_server_ts));
        assert!(session.requested_limits().iter().all(|&l| l == PAGE_SIZE));
    }

    #[tokio::test]
    async fn test_empty_direction() {
        let session = MemorySession::new().with_room(room(), vec![text("T1", 1)], vec![]);

        let merged = merge(&session).await;
        assert_eq!(ids(&merged.events), ["T1"]);
        assert_eq!(merged.forward.pages, 0);
        assert!(merged.forward.error.is_none());
    }

    #[tokio::test]
    async fn test_backward_failure_keeps_forward() {
        let history: Vec<_> = (0..1500).map(|i| text(&format!("h{i}"), i)).collect();
        let session = MemorySession::new()
            .with_room(room(), history, vec![text("F", 9_999)])
            .fail_after(RoomId::new("!r:example.org"), Direction::Backward, 1);

        let merged = merge(&session).await;
        assert!(merged.backward.error.is_some());
        assert_eq!(merged.backward.pages, 1);
        // one page of the newest 1000, reversed, then the forward event
        assert_eq!(merged.events.len(), 1001);
        assert_eq!(merged.events[0].event_id.as_str(), "h500");
        assert_eq!(merged.events[1000].event_id.as_str(), "F");
    }

    /// Serves one backward page whose events all failed to parse, then one
    /// readable page.
    struct UnreadablePage;

    #[async_trait::async_trait]
    impl Session for UnreadablePage {
        async fn rooms(&self) -> crate::Result<Vec<Room>> {
            Ok(vec![room()])
        }

        async fn sync_anchor(&self, _room: &RoomId) -> crate::Result<SyncAnchor> {
            Ok(SyncAnchor {
                prev_batch: "anchor".into(),
            })
        }

        async fn fetch_page(&self, _room: &RoomId, cursor: &PaginationCursor, _limit: u32) -> crate::Result<Page> {
            let page = match (cursor.direction, cursor.token.as_str()) {
                (Direction::Backward, "anchor") => Page {
                    events: vec![],
                    fetched: 2,
                    next: Some("b:2".into()),
                },
                (Direction::Backward, "b:2") => Page {
                    events: vec![text("T1", 1)],
                    fetched: 1,
                    next: Some("b:3".into()),
                },
                _ => Page::default(),
            };
            Ok(page)
        }

        async fn download(&self, uri: &ContentUri) -> crate::Result<Vec<u8>> {
            Err(NetError::MediaNotFound(uri.to_string()))
        }

        async fn logout(&self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_page_does_not_end_history() {
        let session = UnreadablePage;
        let room = room();
        let anchor = session.sync_anchor(&room.id).await.unwrap();

        let merged = merged_history(&session, &room.id, &anchor, &CancellationToken::new()).await;
        assert_eq!(ids(&merged.events), ["T1"]);
        assert_eq!(merged.backward.pages, 2);
        assert!(merged.backward.error.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let session = MemorySession::new().with_room(room(), vec![text("T1", 1)], vec![text("T2", 2)]);
        let room = room();
        let anchor = session.sync_anchor(&room.id).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let merged = merged_history(&session, &room.id, &anchor, &cancel).await;
        assert!(merged.cancelled());
        assert!(merged.events.is_empty());
    }
}
