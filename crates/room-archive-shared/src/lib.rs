//! # room-archive-shared
//!
//! Types shared by every room-archive crate: identifiers, the raw event
//! model handed over by the homeserver session, the archived record written
//! to disk, the event classifier and the attachment crypto.

pub mod classify;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod event;
pub mod naming;
pub mod record;
pub mod types;

pub use classify::{classify, EventClass};
pub use error::{ContentUriError, CryptoError};
pub use event::{ContentUri, MediaReference, RawEvent, UnlockMaterial};
pub use naming::sanitize_component;
pub use record::{ArchivedRecord, RecordKind};
pub use types::{EventId, Member, Room, RoomId, UserId};
