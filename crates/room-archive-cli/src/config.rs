//! Archive configuration: defaults, then `ROOM_ARCHIVE_*` environment
//! variables, then command-line flags.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;

use room_archive_shared::constants::{DEFAULT_HOMESERVER, DEVICE_NAME};
use room_archive_store::{CollisionPolicy, LogFormat};

use crate::archiver::ArchiveOptions;
use crate::error::ConfigError;
use crate::selection::RoomSelection;

/// Archive the history of joined rooms to a folder.
#[derive(Debug, Default, Parser)]
#[command(name = "room-archive", version, about)]
pub struct Cli {
    /// Output folder. Env: `ROOM_ARCHIVE_OUTPUT`
    pub folder: Option<PathBuf>,

    /// Homeserver URL. Env: `ROOM_ARCHIVE_HOMESERVER`
    #[arg(long)]
    pub server: Option<String>,

    /// Full user id, e.g. `@alice:example.org`. Env: `ROOM_ARCHIVE_USER`
    #[arg(long)]
    pub user: Option<String>,

    /// Password. Env: `ROOM_ARCHIVE_PASSWORD`
    #[arg(long)]
    pub userpass: Option<String>,

    /// Do not download attachments. Env: `ROOM_ARCHIVE_NO_MEDIA`
    #[arg(long)]
    pub no_media: bool,

    /// Archive this room id (repeatable).
    #[arg(long = "room", value_name = "ROOM_ID")]
    pub rooms: Vec<String>,

    /// Archive rooms whose id starts with a match of this regex (repeatable).
    #[arg(long = "roomregex", value_name = "PATTERN")]
    pub room_patterns: Vec<String>,

    /// Archive every joined room.
    #[arg(long)]
    pub all_rooms: bool,

    /// duplicate, overwrite or skip. Env: `ROOM_ARCHIVE_ON_COLLISION`
    #[arg(long)]
    pub on_collision: Option<String>,

    /// Room log format, json or yaml. Env: `ROOM_ARCHIVE_LOG_FORMAT`
    #[arg(long)]
    pub format: Option<String>,

    /// Display name of the device created at login.
    #[arg(long)]
    pub device_name: Option<String>,

    /// Print the joined rooms and exit.
    #[arg(long)]
    pub list_rooms: bool,
}

/// Effective configuration of one run.
#[derive(Clone)]
pub struct ArchiveConfig {
    /// Default: `https://matrix-client.matrix.org`
    pub homeserver: String,

    pub user: Option<String>,

    pub password: Option<String>,

    /// Root of every path written by the run. Default: `.`
    pub output_root: PathBuf,

    /// Default: `true`
    pub download_media: bool,

    pub selection: RoomSelection,

    /// Default: [`CollisionPolicy::Duplicate`]
    pub collision: CollisionPolicy,

    /// Default: [`LogFormat::Json`]
    pub log_format: LogFormat,

    /// Default: `room-archive`
    pub device_name: String,

    pub list_rooms: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            homeserver: DEFAULT_HOMESERVER.to_string(),
            user: None,
            password: None,
            output_root: PathBuf::from("."),
            download_media: true,
            selection: RoomSelection::default(),
            collision: CollisionPolicy::default(),
            log_format: LogFormat::default(),
            device_name: DEVICE_NAME.to_string(),
            list_rooms: false,
        }
    }
}

// The password never reaches the log stream.
impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("homeserver", &self.homeserver)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("output_root", &self.output_root)
            .field("download_media", &self.download_media)
            .field("selection", &self.selection)
            .field("collision", &self.collision)
            .field("log_format", &self.log_format)
            .field("device_name", &self.device_name)
            .field("list_rooms", &self.list_rooms)
            .finish()
    }
}

impl ArchiveConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(server) = lookup("ROOM_ARCHIVE_HOMESERVER") {
            config.homeserver = server;
        }

        if let Some(user) = lookup("ROOM_ARCHIVE_USER") {
            config.user = Some(user);
        }

        if let Some(password) = lookup("ROOM_ARCHIVE_PASSWORD") {
            config.password = Some(password);
        }

        if let Some(path) = lookup("ROOM_ARCHIVE_OUTPUT") {
            config.output_root = PathBuf::from(path);
        }

        if let Some(val) = lookup("ROOM_ARCHIVE_NO_MEDIA") {
            config.download_media = val == "false" || val == "0";
        }

        if let Some(val) = lookup("ROOM_ARCHIVE_ON_COLLISION") {
            match val.parse() {
                Ok(policy) => config.collision = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid ROOM_ARCHIVE_ON_COLLISION, using default"),
            }
        }

        if let Some(val) = lookup("ROOM_ARCHIVE_LOG_FORMAT") {
            match val.parse() {
                Ok(format) => config.log_format = format,
                Err(e) => tracing::warn!(error = %e, "Invalid ROOM_ARCHIVE_LOG_FORMAT, using default"),
            }
        }

        config
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(mut self, cli: Cli) -> Result<Self, ConfigError> {
        if let Some(folder) = cli.folder {
            self.output_root = folder;
        }
        if let Some(server) = cli.server {
            self.homeserver = server;
        }
        if let Some(user) = cli.user {
            self.user = Some(user);
        }
        if let Some(password) = cli.userpass {
            self.password = Some(password);
        }
        if cli.no_media {
            self.download_media = false;
        }
        if let Some(val) = cli.on_collision {
            self.collision = val.parse().map_err(|e| ConfigError::InvalidValue {
                name: "--on-collision",
                value: val.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(val) = cli.format {
            self.log_format = val.parse().map_err(|e| ConfigError::InvalidValue {
                name: "--format",
                value: val.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(name) = cli.device_name {
            self.device_name = name;
        }

        self.selection = RoomSelection::new(cli.rooms, &cli.room_patterns, cli.all_rooms)?;
        self.list_rooms = cli.list_rooms;
        Ok(self)
    }

    /// Reject configurations that cannot archive anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        if !self.list_rooms && self.selection.is_empty() {
            return Err(ConfigError::NoRoomsSelected);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let user = self.user.as_deref().ok_or(ConfigError::Missing("user id (--user)"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::Missing("password (--userpass)"))?;
        Ok((user, password))
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            download_media: self.download_media,
            collision: self.collision,
            log_format: self.log_format,
        }
    }
}
