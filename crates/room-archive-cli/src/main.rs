//! # room-archive
//!
//! Archives the full history of joined chat rooms into a folder:
//! - one ordered record log per room (JSON lines or YAML)
//! - attachments, decrypted when the event carries unlock material, stamped
//!   with the time of the event that sent them
//! - a snapshot of the current members' avatars
//! - a small SQLite manifest so later runs can skip attachments already on disk

mod archiver;
mod config;
mod error;
mod selection;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use room_archive_net::{HttpSession, Session};
use room_archive_store::{ensure_dir, Manifest};

use crate::archiver::RoomArchiver;
use crate::config::{ArchiveConfig, Cli};
use crate::error::ArchiveError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,room_archive=debug,room_archive_net=info,room_archive_store=info,room_archive_media=info",
            )
        }))
        .init();

    info!("Starting room-archive v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ArchiveConfig::from_env().apply_cli(Cli::parse())?;
    config.validate()?;
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Establish the session (fatal on failure)
    // -----------------------------------------------------------------------
    let (user, password) = config.credentials()?;
    let session = HttpSession::login(&config.homeserver, user, password, &config.device_name).await?;

    // -----------------------------------------------------------------------
    // 4. Interrupt handling
    // -----------------------------------------------------------------------
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current record");
            on_interrupt.cancel();
        }
    });

    // -----------------------------------------------------------------------
    // 5. Archive, then always tear the session down
    // -----------------------------------------------------------------------
    let outcome = run(&session, &config, &cancel).await;

    if let Err(e) = session.logout().await {
        warn!(error = %e, "Session teardown failed");
    }

    if let Err(e) = &outcome {
        error!(error = %e, "Archive run failed");
    }
    Ok(outcome?)
}

async fn run(session: &HttpSession, config: &ArchiveConfig, cancel: &CancellationToken) -> Result<(), ArchiveError> {
    session.refresh().await?;
    let rooms = session.rooms().await?;

    if config.list_rooms {
        for room in &rooms {
            println!("{}, {}", room.id, room.display_name);
        }
        return Ok(());
    }

    let selected = config.selection.select(&rooms);
    info!(joined = rooms.len(), selected = selected.len(), "Rooms selected");

    ensure_dir(&config.output_root).await?;
    let manifest = Manifest::open_in(&config.output_root)?;

    let archiver = RoomArchiver::new(
        session,
        &manifest,
        &config.output_root,
        config.archive_options(),
        cancel.clone(),
    );
    let summaries = archiver.archive_rooms(&selected).await;

    for summary in &summaries {
        println!(
            "{}: {} written, {} ignored, {} failed{}",
            summary.room_id,
            summary.written,
            summary.ignored,
            summary.failed,
            if summary.interrupted { " (interrupted)" } else { "" }
        );
    }

    if cancel.is_cancelled() {
        return Err(ArchiveError::Interrupted);
    }
    Ok(())
}
