//! Per-room output layout and the output policies chosen by configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use room_archive_shared::constants::{AVATAR_DIR_SUFFIX, MEDIA_DIR_SUFFIX};
use room_archive_shared::{sanitize_component, Room};

use crate::error::StoreError;

/// Serialization of the room log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// One YAML sequence, one entry per record.
    Yaml,
}

impl LogFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Json => "jsonl",
            LogFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for LogFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Ok(LogFormat::Json),
            "yaml" | "yml" => Ok(LogFormat::Yaml),
            other => Err(StoreError::UnknownVariant {
                kind: "log format",
                value: other.to_string(),
            }),
        }
    }
}

/// What to do when an attachment's file name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Write next to it as `name(n).ext`.
    #[default]
    Duplicate,
    /// Replace the existing file.
    Overwrite,
    /// Reuse the file stored for the same event by an earlier run, if the
    /// manifest knows one and it is still on disk. Otherwise duplicate.
    SkipExisting,
}

impl FromStr for CollisionPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duplicate" => Ok(CollisionPolicy::Duplicate),
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "skip" | "skip-existing" => Ok(CollisionPolicy::SkipExisting),
            other => Err(StoreError::UnknownVariant {
                kind: "collision policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Paths owned by one room under the output root:
///
/// ```text
/// <root>/<name>_<id>.<ext>
/// <root>/<name>_<id>_media/
/// <root>/<name>_<id>_avatars/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLayout {
    root: PathBuf,
    stem: String,
}

impl RoomLayout {
    pub fn new(root: &Path, room: &Room) -> Self {
        let name = sanitize_component(&room.display_name, "room");
        let id = sanitize_component(room.id.as_str(), "room");
        Self {
            root: root.to_path_buf(),
            stem: format!("{name}_{id}"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn log_path(&self, format: LogFormat) -> PathBuf {
        self.root
            .join(format!("{}.{}", self.stem, format.extension()))
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join(format!("{}{}", self.stem, MEDIA_DIR_SUFFIX))
    }

    pub fn avatar_dir(&self) -> PathBuf {
        self.root.join(format!("{}{}", self.stem, AVATAR_DIR_SUFFIX))
    }

    /// `path` relative to the output root, `/`-separated, as stored in
    /// records and in the manifest.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Inverse of [`RoomLayout::relative`].
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}
