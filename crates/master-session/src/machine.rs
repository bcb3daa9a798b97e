//! Presence state machine.
//!
//! Every callback of the connection (open, frame, close, error), every timer
//! firing and every control command arrives here as one [`Input`]. A single
//! function, [`PresenceMachine::apply`], updates the presence state and the
//! transcript and returns the side effects the driver must carry out. The
//! machine itself owns no I/O and no timers.

use master_core::codec;
use master_core::{DomainEvent, PresenceState, Status, Transcript};
use tracing::{debug, trace};

/// Transcript line appended when the connection opens.
pub const LINE_ONLINE: &str = "System Online. Connected to Core.";
/// Transcript line appended when the connection is lost.
pub const LINE_OFFLINE: &str = "System Offline. Reconnecting...";
/// Transcript line appended on `sense.vision.presence`.
pub const LINE_USER_DETECTED: &str = "System: User Detected";
/// Transcript line appended on `brain.response.generated`.
pub const LINE_SPEAKING: &str = "System: Speaking...";

/// One discrete input to the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Open a connection unless one is already live.
    ConnectRequested,
    /// The transport finished its handshake.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The keepalive period elapsed.
    KeepaliveTick,
    /// The connection closed, failed, or could not be opened.
    Closed,
    /// The reconnect delay elapsed.
    ReconnectDue,
    /// The speaking fallback elapsed.
    SpeakingTimeout,
    /// Manual status override.
    Control(Status),
    /// The host is going away.
    Shutdown,
}

/// Side effect requested by the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Close any previous link and open a new one.
    Connect,
    /// Write a frame on the live link.
    Send(&'static str),
    /// Close the live link, if any.
    CloseLink,
    /// (Re)start the keepalive interval.
    StartKeepalive,
    /// Stop the keepalive interval.
    StopKeepalive,
    /// (Re)arm the speaking fallback, replacing an armed one.
    ArmSpeakingFallback,
    /// Drop the speaking fallback.
    DisarmSpeakingFallback,
    /// (Re)arm the reconnect delay.
    ScheduleReconnect,
    /// Drop the reconnect delay.
    CancelReconnect,
}

/// Presence state, transcript and connection flag.
#[derive(Clone, Debug)]
pub struct PresenceMachine {
    presence: PresenceState,
    transcript: Transcript,
    connected: bool,
}

impl PresenceMachine {
    /// Locked, neutral, empty transcript of `transcript_capacity` lines.
    pub fn new(transcript_capacity: usize) -> Self {
        Self {
            presence: PresenceState::default(),
            transcript: Transcript::with_capacity(transcript_capacity),
            connected: false,
        }
    }

    /// Current presence.
    pub fn presence(&self) -> PresenceState {
        self.presence
    }

    /// Current transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether a link is open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Apply one input and return the effects to carry out, in order.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::ConnectRequested | Input::ReconnectDue => {
                if self.connected {
                    debug!("already connected, ignoring connect request");
                    Vec::new()
                } else {
                    vec![Effect::Connect]
                }
            }
            Input::Opened => {
                self.connected = true;
                self.presence.status = Status::Idle;
                self.transcript.push(LINE_ONLINE);
                vec![Effect::StartKeepalive]
            }
            Input::Frame(text) => match codec::decode(&text) {
                Some(event) => self.apply_event(event),
                None => {
                    trace!(frame = %text, "frame produced no event");
                    Vec::new()
                }
            },
            Input::KeepaliveTick => {
                if self.connected {
                    vec![Effect::Send(codec::encode_probe())]
                } else {
                    Vec::new()
                }
            }
            Input::Closed => {
                self.connected = false;
                self.presence.status = Status::Locked;
                self.transcript.push(LINE_OFFLINE);
                vec![
                    Effect::StopKeepalive,
                    Effect::DisarmSpeakingFallback,
                    Effect::CloseLink,
                    Effect::ScheduleReconnect,
                ]
            }
            Input::SpeakingTimeout => {
                if self.presence.status == Status::Speaking {
                    debug!("speaking fallback elapsed, settling to idle");
                    self.presence.status = Status::Idle;
                }
                Vec::new()
            }
            Input::Control(status) => {
                self.apply_control(status);
                Vec::new()
            }
            Input::Shutdown => {
                self.connected = false;
                self.presence.status = Status::Locked;
                vec![
                    Effect::StopKeepalive,
                    Effect::DisarmSpeakingFallback,
                    Effect::CancelReconnect,
                    Effect::CloseLink,
                ]
            }
        }
    }

    fn apply_event(&mut self, event: DomainEvent) -> Vec<Effect> {
        debug!(kind = event.kind(), "applying event");
        match event {
            DomainEvent::PresenceDetected => {
                self.transcript.push(LINE_USER_DETECTED);
                Vec::new()
            }
            DomainEvent::ResponseGenerated => {
                self.presence.status = Status::Speaking;
                self.transcript.push(LINE_SPEAKING);
                vec![Effect::ArmSpeakingFallback]
            }
            DomainEvent::SpeechStarted => {
                self.presence.status = Status::Speaking;
                Vec::new()
            }
            DomainEvent::SpeechEnded => {
                self.presence.status = Status::Idle;
                Vec::new()
            }
            DomainEvent::EmotionObserved { label, detail } => {
                self.presence.emotion = label;
                self.transcript.push(format!("Emotion Detected: {detail}"));
                Vec::new()
            }
            DomainEvent::PlainText { text } => {
                self.transcript.push(format!("Core: {text}"));
                Vec::new()
            }
        }
    }

    fn apply_control(&mut self, status: Status) {
        if !self.connected {
            debug!(%status, "ignoring status override while disconnected");
            return;
        }
        if status == Status::Locked {
            debug!("locked is reserved for the disconnected state");
            return;
        }
        self.presence.status = status;
    }
}
