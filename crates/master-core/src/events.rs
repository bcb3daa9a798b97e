//! Domain events decoded from inbound frames.

use crate::presence::Emotion;

/// One typed event carried by an inbound frame.
///
/// Produced by [`crate::codec::decode`]; frames that carry nothing of
/// interest (keepalive echoes, unknown tags) produce no event at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    /// The vision module noticed someone in front of the camera.
    PresenceDetected,
    /// The brain produced a response that is about to be spoken.
    ResponseGenerated,
    /// Text-to-speech playback began.
    SpeechStarted,
    /// Text-to-speech playback finished.
    SpeechEnded,
    /// The vision module classified the user's emotion.
    EmotionObserved {
        /// Resolved emotion label.
        label: Emotion,
        /// Raw payload the label was resolved from.
        detail: String,
    },
    /// An untagged frame, shown verbatim in the transcript.
    PlainText {
        /// Frame text.
        text: String,
    },
}

impl DomainEvent {
    /// Short name used in log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PresenceDetected => "presence_detected",
            Self::ResponseGenerated => "response_generated",
            Self::SpeechStarted => "speech_started",
            Self::SpeechEnded => "speech_ended",
            Self::EmotionObserved { .. } => "emotion_observed",
            Self::PlainText { .. } => "plain_text",
        }
    }
}
