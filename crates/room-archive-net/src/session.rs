//! The session collaborator consumed by the archiver.
//!
//! Everything the archive pipeline needs from the homeserver goes through
//! [`Session`]: a one-shot sync anchor per room, paginated history, content
//! downloads and the joined-room model. Login happens before a session value
//! exists; logout is the last call made on it.

use async_trait::async_trait;

use room_archive_shared::{ContentUri, RawEvent, Room, RoomId};

use crate::error::Result;

/// Pagination direction through a room timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards older events.
    Backward,
    /// Towards newer events.
    Forward,
}

impl Direction {
    /// Value of the `dir` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Direction::Backward => "b",
            Direction::Forward => "f",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Backward => f.write_str("backward"),
            Direction::Forward => f.write_str("forward"),
        }
    }
}

/// Position in a room timeline for one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    pub token: String,
    pub direction: Direction,
}

impl PaginationCursor {
    pub fn new(token: impl Into<String>, direction: Direction) -> Self {
        Self {
            token: token.into(),
            direction,
        }
    }

    /// Move the cursor to the token returned by the last page.
    pub fn advance(&mut self, token: String) {
        self.token = token;
    }
}

/// Snapshot point both pagination directions start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAnchor {
    pub prev_batch: String,
}

/// One `/messages` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub events: Vec<RawEvent>,
    /// Events the server sent, including ones that could not be parsed.
    /// Zero marks the end of history in this direction.
    pub fetched: usize,
    /// Token continuing in the same direction, absent at the end of history.
    pub next: Option<String>,
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Joined rooms, with their current display name and membership.
    async fn rooms(&self) -> Result<Vec<Room>>;

    /// Fresh anchor for the given room.
    async fn sync_anchor(&self, room: &RoomId) -> Result<SyncAnchor>;

    /// Fetch up to `limit` events from `cursor`.
    async fn fetch_page(&self, room: &RoomId, cursor: &PaginationCursor, limit: u32) -> Result<Page>;

    /// Raw bytes behind a content pointer.
    async fn download(&self, uri: &ContentUri) -> Result<Vec<u8>>;

    /// Invalidate the access token. Called once, at teardown.
    async fn logout(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advance_keeps_direction() {
        let mut cursor = PaginationCursor::new("t0", Direction::Backward);
        cursor.advance("t1".into());
        assert_eq!(cursor.token, "t1");
        assert_eq!(cursor.direction, Direction::Backward);
    }

    #[test]
    fn test_direction_query() {
        assert_eq!(Direction::Backward.as_query(), "b");
        assert_eq!(Direction::Forward.as_query(), "f");
    }
}
