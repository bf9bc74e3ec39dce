use thiserror::Error;

use room_archive_shared::RoomId;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Homeserver returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid homeserver URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed homeserver response: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Room {0} is not joined")]
    UnknownRoom(RoomId),

    #[error("Media not found: {0}")]
    MediaNotFound(String),
}

pub type Result<T> = std::result::Result<T, NetError>;
