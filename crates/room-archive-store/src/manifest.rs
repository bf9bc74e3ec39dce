//! Run manifest connection management.
//!
//! The [`Manifest`] owns a [`rusqlite::Connection`] to a small database kept
//! in the output root. It remembers which file each attachment was stored in,
//! the hash of each member's last saved avatar and one row per archive run,
//! so later runs can apply the skip-existing policy.

use std::path::Path;

use rusqlite::Connection;

use room_archive_shared::constants::MANIFEST_FILE_NAME;

use crate::error::Result;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Manifest {
    conn: Connection,
}

impl Manifest {
    /// Open (or create) the manifest of an output root.
    pub fn open_in(output_root: &Path) -> Result<Self> {
        let path = output_root.join(MANIFEST_FILE_NAME);
        tracing::info!(path = %path.display(), "opening run manifest");
        Self::open_at(&path)
    }

    /// Open (or create) a manifest at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Purely in-memory manifest, forgotten when dropped.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let manifest = Manifest::open_in(dir.path()).expect("should open");
        assert!(dir.path().join(MANIFEST_FILE_NAME).exists());

        drop(manifest);
        Manifest::open_in(dir.path()).expect("should reopen");
    }
}
