//! The session driver task.
//!
//! Owns the live link and the three timers (keepalive, reconnect, speaking
//! fallback). One loop waits on whichever notification comes first, turns
//! it into an [`Input`], and runs it through the [`PresenceMachine`]. The
//! effects the machine returns are carried out before the next notification
//! is awaited, so inputs are never processed concurrently.

use std::collections::VecDeque;
use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use master_core::codec;
use master_core::{Status, TransportError};
use master_settings::SessionSettings;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::machine::{Effect, Input, PresenceMachine};
use crate::session::SessionSnapshot;
use crate::transport::{Connector, InboundFrame, Link};

/// Commands sent from a [`crate::SessionHandle`] to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    SetStatus(Status),
}

/// What woke the loop up.
enum Wake {
    Stop,
    Command(Command),
    Frame(InboundFrame),
    LinkError(TransportError),
    LinkClosed,
    SpeakingTimeout,
    KeepaliveTick,
    ReconnectDue,
}

pub(crate) struct Driver {
    machine: PresenceMachine,
    settings: SessionSettings,
    connector: Arc<dyn Connector>,
    link: Option<Box<dyn Link>>,
    keepalive: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,
    speaking_fallback: Option<Pin<Box<Sleep>>>,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    snapshots: watch::Sender<SessionSnapshot>,
    connect_attempts: u64,
}

impl Driver {
    pub(crate) fn new(
        settings: SessionSettings,
        connector: Arc<dyn Connector>,
        commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
        snapshots: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            machine: PresenceMachine::new(settings.transcript_capacity),
            settings,
            connector,
            link: None,
            keepalive: None,
            reconnect: None,
            speaking_fallback: None,
            commands,
            cancel,
            snapshots,
            connect_attempts: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        self.dispatch(Input::ConnectRequested).await;

        loop {
            let wake = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Wake::Stop,
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    // every handle is gone
                    None => Wake::Stop,
                },
                frame = next_frame(&mut self.link) => match frame {
                    Some(Ok(frame)) => Wake::Frame(frame),
                    Some(Err(e)) => Wake::LinkError(e),
                    None => Wake::LinkClosed,
                },
                () = fire(&mut self.speaking_fallback) => Wake::SpeakingTimeout,
                () = tick(&mut self.keepalive) => Wake::KeepaliveTick,
                () = fire(&mut self.reconnect) => Wake::ReconnectDue,
            };

            match wake {
                Wake::Stop => break,
                Wake::Command(Command::SetStatus(status)) => {
                    self.dispatch(Input::Control(status)).await;
                }
                Wake::Frame(InboundFrame::Text(text)) => {
                    self.dispatch(Input::Frame(text)).await;
                }
                Wake::Frame(InboundFrame::Binary(bytes)) => match codec::frame_text(&bytes) {
                    Ok(text) => self.dispatch(Input::Frame(text.to_owned())).await,
                    Err(e) => debug!(error = %e, "dropping undecodable frame"),
                },
                Wake::LinkError(e) => {
                    warn!(error = %e, "transport error, closing link");
                    self.close_link().await;
                    self.dispatch(Input::Closed).await;
                }
                Wake::LinkClosed => {
                    info!("core closed the connection");
                    self.dispatch(Input::Closed).await;
                }
                Wake::SpeakingTimeout => {
                    self.speaking_fallback = None;
                    self.dispatch(Input::SpeakingTimeout).await;
                }
                Wake::KeepaliveTick => self.dispatch(Input::KeepaliveTick).await,
                Wake::ReconnectDue => {
                    self.reconnect = None;
                    self.dispatch(Input::ReconnectDue).await;
                }
            }
        }

        self.dispatch(Input::Shutdown).await;
        info!("session stopped");
    }

    /// Run `input` and every input its effects produce, in order.
    async fn dispatch(&mut self, input: Input) {
        let mut pending = VecDeque::from([input]);
        while let Some(input) = pending.pop_front() {
            let effects = self.machine.apply(input);
            self.publish();
            for effect in effects {
                if let Some(next) = self.execute(effect).await {
                    pending.push_back(next);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<Input> {
        match effect {
            Effect::Connect => return self.connect().await,
            Effect::Send(frame) => {
                let link = self.link.as_mut()?;
                let sent = link.send_text(frame).await;
                if let Err(e) = sent {
                    warn!(error = %e, "keepalive send failed, closing link");
                    self.close_link().await;
                    return Some(Input::Closed);
                }
                debug!(frame, "sent keepalive");
            }
            Effect::CloseLink => self.close_link().await,
            Effect::StartKeepalive => {
                // a zero period would panic in tokio
                let period = self.settings.keepalive_interval().max(Duration::from_millis(1));
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.keepalive = Some(interval);
            }
            Effect::StopKeepalive => self.keepalive = None,
            Effect::ArmSpeakingFallback => {
                self.speaking_fallback =
                    Some(Box::pin(tokio::time::sleep(self.settings.speaking_fallback())));
            }
            Effect::DisarmSpeakingFallback => self.speaking_fallback = None,
            Effect::ScheduleReconnect => {
                let delay = self.settings.reconnect_delay();
                info!(delay_ms = self.settings.reconnect_delay_ms, "reconnect scheduled");
                self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
            }
            Effect::CancelReconnect => self.reconnect = None,
        }
        None
    }

    async fn connect(&mut self) -> Option<Input> {
        // never two live sockets
        self.close_link().await;

        self.connect_attempts += 1;
        let endpoint = self.settings.endpoint.clone();
        let timeout = self.settings.connect_timeout();
        info!(endpoint = %endpoint, attempt = self.connect_attempts, "connecting to core");

        let attempt = tokio::time::timeout(timeout, self.connector.connect(&endpoint));
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!("connect abandoned, session stopping");
                return None;
            }
            result = attempt => result,
        };

        let result = result.unwrap_or_else(|_| {
            Err(TransportError::Timeout {
                endpoint: endpoint.clone(),
                timeout_ms: self.settings.connect_timeout_ms,
            })
        });

        match result {
            Ok(link) => {
                info!(endpoint = %endpoint, "connected to core");
                self.link = Some(link);
                Some(Input::Opened)
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                Some(Input::Closed)
            }
        }
    }

    async fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            presence: self.machine.presence(),
            transcript: self.machine.transcript().to_vec(),
            connected: self.machine.is_connected(),
        };
        let _ = self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn next_frame(
    link: &mut Option<Box<dyn Link>>,
) -> Option<Result<InboundFrame, TransportError>> {
    match link {
        Some(link) => link.next_frame().await,
        None => future::pending().await,
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => future::pending().await,
    }
}
