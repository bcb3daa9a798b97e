//! # master-core
//!
//! Foundation types for the Master System presence client.
//!
//! This crate provides the shared vocabulary the session and console crates
//! depend on:
//!
//! - **Presence**: [`PresenceState`] with its [`Status`] and [`Emotion`] axes
//! - **Events**: [`DomainEvent`], the typed view of one inbound frame
//! - **Codec**: [`codec::decode`] for inbound frames, [`codec::encode_probe`] for the keepalive
//! - **Transcript**: [`Transcript`], the bounded log of recent lines
//! - **Errors**: [`TransportError`] and [`DecodeError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod codec;
pub mod constants;
pub mod errors;
pub mod events;
pub mod logging;
pub mod presence;
pub mod transcript;

pub use errors::{DecodeError, TransportError};
pub use events::DomainEvent;
pub use presence::{Emotion, PresenceState, Status};
pub use transcript::Transcript;
