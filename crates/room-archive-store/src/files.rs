//! Filesystem primitives shared by the log writer and the avatar snapshot.

use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tokio::fs;

use crate::error::{Result, StoreError};

/// Outcome of [`ensure_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirState {
    Created,
    AlreadyPresent,
}

/// Make sure `path` is a directory, creating it (and its parents) if needed.
pub async fn ensure_dir(path: &Path) -> Result<DirState> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(DirState::AlreadyPresent),
        Ok(_) => Err(StoreError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).await?;
            tracing::debug!(path = %path.display(), "created directory");
            Ok(DirState::Created)
        }
        Err(e) => Err(e.into()),
    }
}

/// Return `base` if nothing exists there, otherwise the first free
/// `stem(n).ext` next to it, counting from 1.
///
/// The answer is only valid until something else writes into the directory.
pub async fn allocate_path(base: &Path) -> Result<PathBuf> {
    if !fs::try_exists(base).await? {
        return Ok(base.to_path_buf());
    }

    let stem = base.file_stem().unwrap_or_default();
    let extension = base.extension();

    let mut n: u64 = 1;
    loop {
        let mut name = stem.to_os_string();
        name.push(format!("({n})"));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = base.with_file_name(name);
        if !fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Set access and modification time of `path` to a millisecond timestamp.
pub async fn stamp_file_times(path: &Path, timestamp_ms: u64) -> Result<()> {
    let secs = i64::try_from(timestamp_ms / 1000).unwrap_or(i64::MAX);
    let nanos = ((timestamp_ms % 1000) * 1_000_000) as u32;
    let time = FileTime::from_unix_time(secs, nanos);

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || filetime::set_file_times(&path, time, time))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    Ok(())
}
