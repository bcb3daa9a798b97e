//! Presence state: the status + emotion pair observers render from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the system is doing right now.
///
/// `Locked` doubles as the "no connection to the core" state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Disconnected from the core.
    #[default]
    Locked,
    /// Connected and quiescent.
    Idle,
    /// Capturing user input.
    Listening,
    /// Working on a response.
    Thinking,
    /// Playing back a response.
    Speaking,
}

impl Status {
    /// Lowercase wire/display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion last observed on the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    /// Nothing recognizable (or nothing observed yet).
    #[default]
    Neutral,
    /// Smiling, laughing.
    Happy,
    /// Frowning, shouting.
    Angry,
    /// Downcast.
    Sad,
}

impl Emotion {
    /// Lowercase wire/display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Angry => "angry",
            Self::Sad => "sad",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The minimal state driving everything an observer shows.
///
/// Both fields are set independently. The emotion only carries visual
/// meaning while the status is [`Status::Idle`]; see [`visible_emotion`].
///
/// [`visible_emotion`]: PresenceState::visible_emotion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    /// Current status.
    pub status: Status,
    /// Last observed emotion.
    pub emotion: Emotion,
}

impl PresenceState {
    /// The emotion an observer should accent with, if any.
    ///
    /// Any non-idle status takes precedence, and `Neutral` never accents.
    pub fn visible_emotion(&self) -> Option<Emotion> {
        (self.status == Status::Idle && self.emotion != Emotion::Neutral).then_some(self.emotion)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.status, self.emotion)
    }
}
