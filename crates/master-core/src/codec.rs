//! Text frame codec for the core's event socket.
//!
//! Inbound frames are either `TAG|PAYLOAD` or a bare line of text:
//!
//! - Tagged frames are split at the first `|`. Only the tags in [`EventTag`]
//!   produce events; anything else is dropped for forward compatibility.
//! - The payload is free text and is only ever inspected by substring.
//! - Bare frames become [`DomainEvent::PlainText`], except the keepalive
//!   chatter (`ping`, `Echo: ping`) which produces nothing.
//!
//! Decoding is total. A frame that makes no sense yields `None`, never an
//! error, so a bad frame can never take the connection down.
//!
//! The only outbound frame is the keepalive probe, see [`encode_probe`].

use tracing::trace;

use crate::errors::DecodeError;
use crate::events::DomainEvent;
use crate::presence::Emotion;

/// Separator between the tag and the payload of a tagged frame.
pub const SEPARATOR: char = '|';

/// Keepalive probe sent by the client.
pub const PING: &str = "ping";

/// Keepalive probe as echoed back by the core.
pub const ECHOED_PING: &str = "Echo: ping";

/// Tags with a meaning for presence derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTag {
    /// `sense.vision.presence`
    Presence,
    /// `brain.response.generated`
    ResponseGenerated,
    /// `feedback.tts.start`
    SpeechStart,
    /// `feedback.tts.end`
    SpeechEnd,
    /// `sense.vision.emotion`
    Emotion,
}

impl EventTag {
    /// Wire name of the tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Presence => "sense.vision.presence",
            Self::ResponseGenerated => "brain.response.generated",
            Self::SpeechStart => "feedback.tts.start",
            Self::SpeechEnd => "feedback.tts.end",
            Self::Emotion => "sense.vision.emotion",
        }
    }

    /// Look up a wire name. Exact match only.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "sense.vision.presence" => Some(Self::Presence),
            "brain.response.generated" => Some(Self::ResponseGenerated),
            "feedback.tts.start" => Some(Self::SpeechStart),
            "feedback.tts.end" => Some(Self::SpeechEnd),
            "sense.vision.emotion" => Some(Self::Emotion),
            _ => None,
        }
    }
}

/// Decode one inbound text frame.
pub fn decode(frame: &str) -> Option<DomainEvent> {
    let Some((tag, payload)) = frame.split_once(SEPARATOR) else {
        return decode_bare(frame);
    };

    let Some(tag) = EventTag::parse(tag) else {
        trace!(tag, "ignoring frame with unrecognized tag");
        return None;
    };

    let event = match tag {
        EventTag::Presence => DomainEvent::PresenceDetected,
        EventTag::ResponseGenerated => DomainEvent::ResponseGenerated,
        EventTag::SpeechStart => DomainEvent::SpeechStarted,
        EventTag::SpeechEnd => DomainEvent::SpeechEnded,
        EventTag::Emotion => DomainEvent::EmotionObserved {
            label: resolve_emotion(payload),
            detail: payload.to_owned(),
        },
    };
    Some(event)
}

fn decode_bare(frame: &str) -> Option<DomainEvent> {
    if is_keepalive(frame) {
        return None;
    }
    Some(DomainEvent::PlainText {
        text: frame.to_owned(),
    })
}

/// Whether a bare frame is keepalive chatter.
pub fn is_keepalive(frame: &str) -> bool {
    frame == PING || frame == ECHOED_PING
}

/// Resolve an emotion label from a free-form payload.
///
/// Checks `happy`, `angry`, `sad` in that order; the first hit wins.
pub fn resolve_emotion(payload: &str) -> Emotion {
    if payload.contains("happy") {
        Emotion::Happy
    } else if payload.contains("angry") {
        Emotion::Angry
    } else if payload.contains("sad") {
        Emotion::Sad
    } else {
        Emotion::Neutral
    }
}

/// View a binary frame as text.
pub fn frame_text(bytes: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(bytes).map_err(|e| DecodeError::NotUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

/// The keepalive probe frame.
pub const fn encode_probe() -> &'static str {
    PING
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn presence_tag() {
        assert_eq!(
            decode("sense.vision.presence|{'faces': 1}"),
            Some(DomainEvent::PresenceDetected)
        );
    }

    #[test]
    fn response_tag() {
        assert_eq!(
            decode("brain.response.generated|hello"),
            Some(DomainEvent::ResponseGenerated)
        );
    }

    #[test]
    fn speech_tags() {
        assert_eq!(decode("feedback.tts.start|{}"), Some(DomainEvent::SpeechStarted));
        assert_eq!(decode("feedback.tts.end|{}"), Some(DomainEvent::SpeechEnded));
    }

    #[test]
    fn empty_payload_is_still_tagged() {
        assert_eq!(decode("feedback.tts.end|"), Some(DomainEvent::SpeechEnded));
    }

    #[test]
    fn emotion_tag_keeps_payload_as_detail() {
        let event = decode("sense.vision.emotion|user looks happy today");
        assert_eq!(
            event,
            Some(DomainEvent::EmotionObserved {
                label: Emotion::Happy,
                detail: "user looks happy today".into(),
            })
        );
    }

    #[test]
    fn emotion_priority_happy_beats_sad() {
        assert_eq!(resolve_emotion("sad but also happy"), Emotion::Happy);
        assert_eq!(resolve_emotion("angry and sad"), Emotion::Angry);
        assert_eq!(resolve_emotion("just sad"), Emotion::Sad);
    }

    #[test]
    fn emotion_without_keyword_is_neutral() {
        assert_eq!(resolve_emotion("{'emotion': 'surprise'}"), Emotion::Neutral);
        assert_eq!(resolve_emotion(""), Emotion::Neutral);
    }

    #[test]
    fn emotion_match_is_case_sensitive() {
        assert_eq!(resolve_emotion("HAPPY"), Emotion::Neutral);
    }

    #[test]
    fn split_happens_at_first_separator() {
        let event = decode("sense.vision.emotion|a|sad|b");
        assert_matches!(
            event,
            Some(DomainEvent::EmotionObserved { label: Emotion::Sad, ref detail }) if detail == "a|sad|b"
        );
    }

    #[test]
    fn unknown_tags_are_ignored() {
        assert_eq!(decode("sense.voice.command|{'text': 'lights on'}"), None);
        assert_eq!(decode("sense.vision.identified|{'name': 'ann'}"), None);
        assert_eq!(decode("|payload"), None);
        assert_eq!(decode("|"), None);
    }

    #[test]
    fn tag_match_is_exact() {
        assert_eq!(decode(" sense.vision.presence|x"), None);
        assert_eq!(decode("SENSE.VISION.PRESENCE|x"), None);
    }

    #[test]
    fn bare_frame_is_plain_text() {
        assert_eq!(
            decode("Hello from core"),
            Some(DomainEvent::PlainText {
                text: "Hello from core".into()
            })
        );
    }

    #[test]
    fn keepalive_chatter_produces_nothing() {
        assert_eq!(decode("ping"), None);
        assert_eq!(decode("Echo: ping"), None);
    }

    #[test]
    fn keepalive_filter_is_exact() {
        assert_matches!(decode("ping "), Some(DomainEvent::PlainText { .. }));
        assert_matches!(decode("Echo: pong"), Some(DomainEvent::PlainText { .. }));
        assert_matches!(decode(""), Some(DomainEvent::PlainText { ref text }) if text.is_empty());
    }

    #[test]
    fn tag_names_round_trip() {
        for tag in [
            EventTag::Presence,
            EventTag::ResponseGenerated,
            EventTag::SpeechStart,
            EventTag::SpeechEnd,
            EventTag::Emotion,
        ] {
            assert_eq!(EventTag::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn probe_is_ping() {
        assert_eq!(encode_probe(), "ping");
        assert!(is_keepalive(encode_probe()));
    }

    #[test]
    fn frame_text_accepts_utf8() {
        assert_eq!(frame_text("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn frame_text_rejects_invalid_utf8() {
        let err = frame_text(&[b'o', b'k', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err, DecodeError::NotUtf8 { valid_up_to: 2 });
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_is_total(frame in ".*") {
                let _ = decode(&frame);
            }

            #[test]
            fn bare_frames_are_echoed_verbatim(frame in "[^|]*") {
                prop_assume!(!is_keepalive(&frame));
                prop_assert_eq!(decode(&frame), Some(DomainEvent::PlainText { text: frame.clone() }));
            }

            #[test]
            fn emotion_label_follows_priority(payload in "[a-z ]{0,40}") {
                let event = decode(&format!("sense.vision.emotion|{payload}"));
                let expected = if payload.contains("happy") {
                    Emotion::Happy
                } else if payload.contains("angry") {
                    Emotion::Angry
                } else if payload.contains("sad") {
                    Emotion::Sad
                } else {
                    Emotion::Neutral
                };
                prop_assert_eq!(event, Some(DomainEvent::EmotionObserved { label: expected, detail: payload }));
            }
        }
    }
}
