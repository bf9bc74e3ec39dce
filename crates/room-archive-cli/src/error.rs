use room_archive_net::NetError;
use room_archive_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid {name} {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid room pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No rooms selected, pass --room, --roomregex, --all-rooms or --list-rooms")]
    NoRoomsSelected,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Homeserver error: {0}")]
    Net(#[from] NetError),

    #[error("Archive storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Interrupted")]
    Interrupted,
}
