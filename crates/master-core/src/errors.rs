//! Error types for the transport and the frame codec.
//!
//! Neither error is ever fatal. A [`TransportError`] routes the session
//! through its close/reconnect path; a [`DecodeError`] drops one frame.

use thiserror::Error;

/// Failures of the socket carrying the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect {
        /// Endpoint we tried to reach.
        endpoint: String,
        /// Why it failed (refused, DNS, handshake).
        reason: String,
    },

    /// The connection attempt did not finish in time.
    #[error("connect to {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        /// Endpoint we tried to reach.
        endpoint: String,
        /// How long we waited.
        timeout_ms: u64,
    },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// A frame that cannot be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A binary frame whose bytes are not UTF-8.
    #[error("frame is not valid UTF-8 (valid up to byte {valid_up_to})")]
    NotUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },
}
