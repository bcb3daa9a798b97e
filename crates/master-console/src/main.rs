//! # master-console
//!
//! Headless observer for the Master System core. Connects to the core,
//! keeps the session alive, and logs every presence and transcript change
//! until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use master_core::logging::{self, LogFormat};
use master_session::{SessionManager, SessionSnapshot};
use master_settings::{MasterSettings, SettingsError};
use tokio::sync::watch;
use tracing::{info, warn};

/// Master System console observer.
#[derive(Parser, Debug)]
#[command(name = "master-console", about = "Master System console observer")]
struct Cli {
    /// Core WebSocket endpoint (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Path to the settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or `EnvFilter` directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<FormatArg>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Compact,
    Json,
}

impl From<FormatArg> for LogFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Compact => Self::Compact,
            FormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Fold CLI flags over loaded settings.
    fn apply(&self, settings: &mut MasterSettings) {
        if let Some(ref url) = self.url {
            settings.session.endpoint.clone_from(url);
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format.into();
        }
    }
}

/// Load settings, keeping the error so it can be logged once logging is up.
fn load(cli: &Cli) -> (MasterSettings, Option<SettingsError>) {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(master_settings::settings_path);
    match master_settings::load_settings_from_path(&path) {
        Ok(settings) => (settings, None),
        Err(e) => (MasterSettings::default(), Some(e)),
    }
}

/// One log line per change, until the session drops its sender.
async fn observe(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut last = rx.borrow_and_update().clone();
    while rx.changed().await.is_ok() {
        let snap = rx.borrow_and_update().clone();
        if snap.presence != last.presence || snap.connected != last.connected {
            info!(
                status = %snap.presence.status,
                emotion = %snap.presence.emotion,
                visible_emotion = ?snap.presence.visible_emotion(),
                connected = snap.connected,
                "presence"
            );
        }
        if snap.transcript != last.transcript {
            if let Some(line) = snap.transcript.last() {
                info!(line = %line, "transcript");
            }
        }
        last = snap;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut settings, load_error) = load(&cli);
    cli.apply(&mut settings);
    logging::init_subscriber(&settings.logging.level, settings.logging.format);
    if let Some(e) = load_error {
        warn!(error = %e, "failed to load settings, using defaults");
    }
    settings.validate().context("Invalid settings")?;

    info!(
        endpoint = %settings.session.endpoint,
        version = master_core::constants::VERSION,
        "starting console"
    );
    let mut handle = SessionManager::websocket(settings.session).start();
    let observer = tokio::spawn(observe(handle.subscribe()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("shutting down");
    handle.stop().await;
    drop(handle);
    let _ = observer.await;
    Ok(())
}
