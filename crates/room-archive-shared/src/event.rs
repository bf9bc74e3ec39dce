//! Raw homeserver events and the media references found inside them.
//!
//! A [`RawEvent`] is kept close to the wire shape: the `content` tree is left
//! untyped because its schema depends on the event type. Media references are
//! narrowed into [`MediaReference::Encrypted`] or [`MediaReference::Plaintext`]
//! once, when they are read out of the content.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::CONTENT_URI_SCHEME;
use crate::error::ContentUriError;
use crate::types::{EventId, UserId};

// ---------------------------------------------------------------------------
// RawEvent
// ---------------------------------------------------------------------------

/// A room event exactly as returned by the homeserver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEvent {
    pub event_id: EventId,
    pub sender: UserId,
    /// Milliseconds since the unix epoch, as stamped by the origin server.
    pub origin_server_ts: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub unsigned: Value,
}

impl RawEvent {
    /// Whether moderation removed the content of this event.
    pub fn is_redacted(&self) -> bool {
        self.unsigned
            .get("redacted_because")
            .is_some_and(|v| !v.is_null())
    }

    pub fn msgtype(&self) -> Option<&str> {
        self.content.get("msgtype").and_then(Value::as_str)
    }

    pub fn body(&self) -> Option<&str> {
        self.content.get("body").and_then(Value::as_str)
    }

    /// The attachment carried by this event, if any.
    pub fn media_reference(&self) -> Option<MediaReference> {
        MediaReference::from_content(&self.content)
    }
}

// ---------------------------------------------------------------------------
// ContentUri
// ---------------------------------------------------------------------------

/// `mxc://<server-name>/<media-id>` content pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    server_name: String,
    media_id: String,
}

impl ContentUri {
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }
}

impl FromStr for ContentUri {
    type Err = ContentUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(CONTENT_URI_SCHEME)
            .ok_or_else(|| ContentUriError::WrongScheme(s.to_string()))?;

        let (server_name, media_id) = rest.split_once('/').unwrap_or((rest, ""));
        if server_name.is_empty() {
            return Err(ContentUriError::MissingServer(s.to_string()));
        }

        let media_id = media_id.trim_matches('/');
        if media_id.is_empty() {
            return Err(ContentUriError::MissingMediaId(s.to_string()));
        }

        Ok(Self {
            server_name: server_name.to_string(),
            media_id: media_id.to_string(),
        })
    }
}

impl TryFrom<String> for ContentUri {
    type Error = ContentUriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.to_string()
    }
}

impl std::fmt::Display for ContentUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", CONTENT_URI_SCHEME, self.server_name, self.media_id)
    }
}

// ---------------------------------------------------------------------------
// MediaReference
// ---------------------------------------------------------------------------

/// Key material needed to open an encrypted attachment, still in its
/// transport encoding (base64).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockMaterial {
    /// JWK `k` field: unpadded base64url AES-256 key.
    pub key: String,
    /// Base64 SHA-256 of the ciphertext.
    pub sha256: String,
    /// Base64 AES-CTR initialization vector.
    pub iv: String,
}

impl UnlockMaterial {
    /// Read unlock material from an encrypted-file envelope. Any missing
    /// field means the attachment is not actually encrypted.
    fn from_envelope(file: &Value) -> Option<Self> {
        let key = file.pointer("/key/k").and_then(Value::as_str)?;
        let sha256 = file.pointer("/hashes/sha256").and_then(Value::as_str)?;
        let iv = file.get("iv").and_then(Value::as_str)?;

        if key.is_empty() || sha256.is_empty() || iv.is_empty() {
            return None;
        }

        Some(Self {
            key: key.to_string(),
            sha256: sha256.to_string(),
            iv: iv.to_string(),
        })
    }
}

/// Attachment pointer, narrowed at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    Encrypted {
        uri: ContentUri,
        unlock: UnlockMaterial,
    },
    Plaintext {
        uri: ContentUri,
    },
}

impl MediaReference {
    /// Extract the attachment of a message content tree.
    ///
    /// An encrypted-file envelope (`content.file`) wins over a plain
    /// `content.url`. An envelope with incomplete key material is read as
    /// plaintext.
    pub fn from_content(content: &Value) -> Option<Self> {
        let envelope = content.get("file").filter(|f| f.is_object());

        if let Some(file) = envelope {
            if let Some(uri) = parse_uri(file.get("url")) {
                return Some(match UnlockMaterial::from_envelope(file) {
                    Some(unlock) => Self::Encrypted { uri, unlock },
                    None => Self::Plaintext { uri },
                });
            }
        }

        parse_uri(content.get("url")).map(|uri| Self::Plaintext { uri })
    }

    pub fn uri(&self) -> &ContentUri {
        match self {
            Self::Encrypted { uri, .. } | Self::Plaintext { uri } => uri,
        }
    }
}

fn parse_uri(value: Option<&Value>) -> Option<ContentUri> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}
