/// Default device display name registered at login
pub const DEVICE_NAME: &str = "room-archive";

/// Default homeserver used when none is configured
pub const DEFAULT_HOMESERVER: &str = "https://matrix-client.matrix.org";

/// Number of events requested per `/messages` call
pub const PAGE_SIZE: u32 = 1000;

/// Scheme of homeserver content pointers
pub const CONTENT_URI_SCHEME: &str = "mxc://";

/// AES-256 key size in bytes
pub const ATTACHMENT_KEY_SIZE: usize = 32;

/// AES-CTR initialization vector size in bytes
pub const ATTACHMENT_IV_SIZE: usize = 16;

/// SHA-256 digest size in bytes
pub const SHA256_SIZE: usize = 32;

/// Suffix of the per-room media directory
pub const MEDIA_DIR_SUFFIX: &str = "_media";

/// Suffix of the per-room avatar directory
pub const AVATAR_DIR_SUFFIX: &str = "_avatars";

/// File name of the run manifest inside the output root
pub const MANIFEST_FILE_NAME: &str = ".room-archive.db";

/// Message types archived as text records
pub const TEXT_MSGTYPES: &[&str] = &["m.text", "m.notice", "m.emote"];

/// Message types archived as media records
pub const MEDIA_MSGTYPES: &[&str] = &["m.image", "m.file", "m.audio", "m.video"];
