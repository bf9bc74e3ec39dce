use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error in the run manifest.
    #[error("Manifest database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (creating directories, writing files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A path that must be a directory exists as something else.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Record could not be encoded as JSON.
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record could not be encoded as YAML.
    #[error("YAML encode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Unknown value for a configuration enum.
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
