//! Session lifecycle and the observer interface.

use std::sync::Arc;
use std::time::Duration;

use master_core::{PresenceState, Status};
use master_settings::SessionSettings;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span, warn};

use crate::driver::{Command, Driver};
use crate::transport::{Connector, WsConnector};

/// How long [`SessionHandle::stop`] waits for the driver before aborting it.
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything an observer needs to draw the current state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Status and emotion.
    pub presence: PresenceState,
    /// Recent transcript lines, oldest first.
    pub transcript: Vec<String>,
    /// Whether a link to the core is open.
    pub connected: bool,
}

/// Builds and starts a session.
pub struct SessionManager {
    settings: SessionSettings,
    connector: Arc<dyn Connector>,
}

impl SessionManager {
    /// Session over an arbitrary transport.
    pub fn new(settings: SessionSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Session over WebSocket.
    pub fn websocket(settings: SessionSettings) -> Self {
        Self::new(settings, Arc::new(WsConnector))
    }

    /// Spawn the driver and connect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let cancel = CancellationToken::new();

        let span = info_span!("session", endpoint = %self.settings.endpoint);
        let driver = Driver::new(
            self.settings,
            self.connector,
            command_rx,
            cancel.clone(),
            snapshot_tx,
        );
        let task = tokio::spawn(driver.run().instrument(span));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Owner's handle on a running session.
///
/// Dropping the handle stops the session as well; [`stop`](Self::stop)
/// additionally waits for teardown to finish.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Override the status (`Idle`, `Listening`, `Thinking`, `Speaking`).
    ///
    /// Ignored while disconnected. Returns `false` if the session has
    /// stopped or its command queue is full.
    pub fn set_status(&self, status: Status) -> bool {
        self.commands.try_send(Command::SetStatus(status)).is_ok()
    }

    /// Whether the driver is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the session and wait for teardown.
    ///
    /// Safe to call in any state, and more than once.
    pub async fn stop(&mut self) {
        self.stop_with_timeout(DEFAULT_STOP_TIMEOUT).await;
    }

    /// Stop the session, aborting the driver if teardown exceeds `timeout`.
    pub async fn stop_with_timeout(&mut self, timeout: Duration) {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        let abort = task.abort_handle();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "session task ended abnormally"),
            Err(_) => {
                warn!("session teardown timed out after {timeout:?}, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
