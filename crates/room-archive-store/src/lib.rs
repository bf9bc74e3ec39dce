//! # room-archive-store
//!
//! Everything that touches the output directory: collision-free file names,
//! idempotent directory creation, file timestamps, the per-room log writer,
//! avatar snapshots and the SQLite run manifest kept next to the archive.
//!
//! All file I/O goes through `tokio::fs`. Path allocation is check-then-create
//! and assumes a single writer per output root.

pub mod avatars;
pub mod files;
pub mod layout;
pub mod manifest;
pub mod media_files;
pub mod migrations;
pub mod models;
pub mod runs;
pub mod snapshot;
pub mod writer;

mod error;

pub use error::{Result, StoreError};
pub use files::{allocate_path, ensure_dir, stamp_file_times, DirState};
pub use layout::{CollisionPolicy, LogFormat, RoomLayout};
pub use manifest::Manifest;
pub use models::*;
pub use snapshot::{snapshot_avatars, AvatarSummary};
pub use writer::{ArchiveWriter, StoredMedia};
