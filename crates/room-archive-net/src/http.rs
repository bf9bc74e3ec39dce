//! Client-server API session over HTTPS.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use room_archive_shared::{ContentUri, RawEvent, Room, RoomId, UserId};

use crate::error::{NetError, Result};
use crate::session::{Page, PaginationCursor, Session, SyncAnchor};
use crate::sync::{rooms_from_sync, SyncResponse, SyncedRoom};

/// Only the newest event is needed per room; history comes from `/messages`.
const SYNC_TIMELINE_LIMIT: u32 = 1;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user_id: String,
    access_token: String,
    #[serde(default)]
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    chunk: Vec<Value>,
    end: Option<String>,
}

/// Authenticated homeserver session.
pub struct HttpSession {
    client: Client,
    homeserver: Url,
    access_token: String,
    user_id: UserId,
    rooms: RwLock<BTreeMap<RoomId, SyncedRoom>>,
}

impl HttpSession {
    /// Log in with a password. A failure here aborts the run.
    pub async fn login(homeserver: &str, user: &str, password: &str, device_name: &str) -> Result<Self> {
        let homeserver = parse_homeserver(homeserver)?;
        let client = Client::builder()
            .user_agent(concat!("room-archive/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let url = endpoint(&homeserver, &["_matrix", "client", "v3", "login"])?;
        let body = json!({
            "type": "m.login.password",
            "identifier": { "type": "m.id.user", "user": user },
            "password": password,
            "initial_device_display_name": device_name,
        });

        let response = check(client.post(url).json(&body).send().await?).await?;
        let login: LoginResponse = response.json().await?;

        info!(user = %login.user_id, device = ?login.device_id, "Logged in");

        Ok(Self {
            client,
            homeserver,
            access_token: login.access_token,
            user_id: UserId::new(login.user_id),
            rooms: RwLock::new(BTreeMap::new()),
        })
    }

    /// Full-state sync limited to one timeline event per room. Replaces the
    /// cached room model.
    pub async fn refresh(&self) -> Result<()> {
        let url = self.endpoint(&["_matrix", "client", "v3", "sync"])?;
        let filter = json!({ "room": { "timeline": { "limit": SYNC_TIMELINE_LIMIT } } }).to_string();

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("full_state", "true"), ("timeout", "0"), ("filter", filter.as_str())])
            .send()
            .await?;
        let sync: SyncResponse = check(response).await?.json().await?;

        let synced = rooms_from_sync(sync, &self.user_id);
        debug!(rooms = synced.len(), "Sync complete");

        let mut rooms = self.rooms.write().await;
        rooms.clear();
        rooms.extend(synced.into_iter().map(|s| (s.room.id.clone(), s)));
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.homeserver, segments)
    }

    async fn download_from(&self, segments: &[&str]) -> Result<Response> {
        let url = self.endpoint(segments)?;
        Ok(self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn rooms(&self) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.values().map(|s| s.room.clone()).collect())
    }

    async fn sync_anchor(&self, room: &RoomId) -> Result<SyncAnchor> {
        self.refresh().await?;

        let rooms = self.rooms.read().await;
        let synced = rooms
            .get(room)
            .ok_or_else(|| NetError::UnknownRoom(room.clone()))?;
        let prev_batch = synced
            .prev_batch
            .clone()
            .ok_or_else(|| NetError::Protocol(format!("sync returned no prev_batch for {room}")))?;

        Ok(SyncAnchor { prev_batch })
    }

    async fn fetch_page(&self, room: &RoomId, cursor: &PaginationCursor, limit: u32) -> Result<Page> {
        let url = self.endpoint(&["_matrix", "client", "v3", "rooms", room.as_str(), "messages"])?;
        let limit = limit.to_string();

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("from", cursor.token.as_str()),
                ("dir", cursor.direction.as_query()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let messages: MessagesResponse = check(response).await?.json().await?;

        let fetched = messages.chunk.len();
        let mut events = Vec::with_capacity(fetched);
        for value in messages.chunk {
            match serde_json::from_value::<RawEvent>(value) {
                Ok(event) => events.push(event),
                Err(e) => debug!(room = %room, error = %e, "Skipping malformed event"),
            }
        }

        Ok(Page {
            events,
            fetched,
            next: messages.end,
        })
    }

    async fn download(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        let (server, media) = (uri.server_name(), uri.media_id());

        let mut response = self
            .download_from(&["_matrix", "client", "v1", "media", "download", server, media])
            .await?;

        // Older homeservers only serve the unauthenticated media route
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::METHOD_NOT_ALLOWED
        ) {
            debug!(%uri, status = %response.status(), "Authenticated media route unavailable, trying legacy route");
            response = self
                .download_from(&["_matrix", "media", "v3", "download", server, media])
                .await?;
        }

        if response.status() == StatusCode::NOT_FOUND {
            return Err(NetError::MediaNotFound(uri.to_string()));
        }

        let bytes = check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn logout(&self) -> Result<()> {
        let url = self.endpoint(&["_matrix", "client", "v3", "logout"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await?;

        check(response).await?;
        info!(user = %self.user_id, "Logged out");
        Ok(())
    }
}

/// Accept bare host names by assuming https.
fn parse_homeserver(homeserver: &str) -> Result<Url> {
    let trimmed = homeserver.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&with_scheme).map_err(|e| NetError::InvalidUrl(format!("{homeserver}: {e}")))
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| NetError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NetError::Status {
        status: status.as_u16(),
        body,
    })
}
