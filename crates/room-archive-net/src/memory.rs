//! In-memory [`Session`] with a scripted timeline per room.
//!
//! Each room timeline is split at the anchor into `history` (before) and
//! `future` (after), both oldest first. Tokens are `anchor`, `b:<n>` and
//! `f:<n>` where `n` counts events already served in that direction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use room_archive_shared::{ContentUri, RawEvent, Room, RoomId};

use crate::error::{NetError, Result};
use crate::session::{Direction, Page, PaginationCursor, Session, SyncAnchor};

const ANCHOR_TOKEN: &str = "anchor";

struct Timeline {
    history: Vec<RawEvent>,
    future: Vec<RawEvent>,
}

#[derive(Default)]
pub struct MemorySession {
    rooms: Vec<Room>,
    timelines: HashMap<RoomId, Timeline>,
    media: HashMap<ContentUri, Vec<u8>>,
    interrupts: HashMap<ContentUri, CancellationToken>,
    failing_anchors: Vec<RoomId>,
    fail_after: HashMap<(RoomId, Direction), usize>,
    served: Mutex<HashMap<(RoomId, Direction), usize>>,
    limits: Mutex<Vec<u32>>,
    downloads: Mutex<Vec<ContentUri>>,
    logged_out: AtomicBool,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_room(mut self, room: Room, history: Vec<RawEvent>, future: Vec<RawEvent>) -> Self {
        self.timelines
            .insert(room.id.clone(), Timeline { history, future });
        self.rooms.push(room);
        self
    }

    pub fn with_media(mut self, uri: ContentUri, bytes: Vec<u8>) -> Self {
        self.media.insert(uri, bytes);
        self
    }

    /// Cancel `token` when `uri` is downloaded, as if the operator
    /// interrupted the run while that attachment was in flight.
    pub fn cancel_on_download(mut self, uri: ContentUri, token: CancellationToken) -> Self {
        self.interrupts.insert(uri, token);
        self
    }

    /// Serve `pages` pages in `direction`, then fail every further request.
    pub fn fail_after(mut self, room: RoomId, direction: Direction, pages: usize) -> Self {
        self.fail_after.insert((room, direction), pages);
        self
    }

    pub fn fail_anchor(mut self, room: RoomId) -> Self {
        self.failing_anchors.push(room);
        self
    }

    pub fn requested_limits(&self) -> Vec<u32> {
        self.limits.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn downloads(&self) -> Vec<ContentUri> {
        self.downloads.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    fn offset(token: &str) -> Result<usize> {
        if token == ANCHOR_TOKEN {
            return Ok(0);
        }
        token
            .split_once(':')
            .and_then(|(_, n)| n.parse().ok())
            .ok_or_else(|| NetError::Protocol(format!("unknown pagination token {token}")))
    }

    fn record_page(&self, room: &RoomId, direction: Direction) -> Result<()> {
        let key = (room.clone(), direction);
        let mut served = self
            .served
            .lock()
            .map_err(|e| NetError::Protocol(format!("lock poisoned: {e}")))?;
        let count = served.entry(key.clone()).or_insert(0);

        if let Some(&limit) = self.fail_after.get(&key) {
            if *count >= limit {
                return Err(NetError::Status {
                    status: 502,
                    body: "scripted failure".into(),
                });
            }
        }
        *count += 1;
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn rooms(&self) -> Result<Vec<Room>> {
        Ok(self.rooms.clone())
    }

    async fn sync_anchor(&self, room: &RoomId) -> Result<SyncAnchor> {
        if self.failing_anchors.contains(room) {
            return Err(NetError::Status {
                status: 500,
                body: "scripted sync failure".into(),
            });
        }
        if !self.timelines.contains_key(room) {
            return Err(NetError::UnknownRoom(room.clone()));
        }
        Ok(SyncAnchor {
            prev_batch: ANCHOR_TOKEN.to_string(),
        })
    }

    async fn fetch_page(&self, room: &RoomId, cursor: &PaginationCursor, limit: u32) -> Result<Page> {
        if let Ok(mut limits) = self.limits.lock() {
            limits.push(limit);
        }

        let timeline = self
            .timelines
            .get(room)
            .ok_or_else(|| NetError::UnknownRoom(room.clone()))?;
        self.record_page(room, cursor.direction)?;

        let offset = Self::offset(&cursor.token)?;
        let limit = limit as usize;

        let events: Vec<RawEvent> = match cursor.direction {
            Direction::Backward => timeline
                .history
                .iter()
                .rev()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            Direction::Forward => timeline
                .future
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        };

        let prefix = match cursor.direction {
            Direction::Backward => "b",
            Direction::Forward => "f",
        };
        let next = Some(format!("{prefix}:{}", offset + events.len()));

        Ok(Page {
            fetched: events.len(),
            events,
            next,
        })
    }

    async fn download(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        if let Ok(mut downloads) = self.downloads.lock() {
            downloads.push(uri.clone());
        }
        if let Some(token) = self.interrupts.get(uri) {
            token.cancel();
        }
        self.media
            .get(uri)
            .cloned()
            .ok_or_else(|| NetError::MediaNotFound(uri.to_string()))
    }

    async fn logout(&self) -> Result<()> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}
