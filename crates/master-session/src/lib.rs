//! # master-session
//!
//! Connection lifecycle and presence derivation for the Master System client.
//!
//! A session keeps one WebSocket link to the core open, probes it with a
//! keepalive, reconnects after a fixed delay whenever it drops, and turns
//! the inbound frames into a [`SessionSnapshot`] (presence + transcript)
//! that any observer can watch.
//!
//! - [`machine`]: the pure input → state + effects function
//! - [`transport`]: the `Connector`/`Link` seam and its WebSocket implementation
//! - [`SessionManager`] / [`SessionHandle`]: start, observe, control, stop

#![deny(unsafe_code)]

mod driver;
pub mod machine;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;

pub use machine::{Effect, Input, PresenceMachine};
pub use session::{SessionHandle, SessionManager, SessionSnapshot};
pub use transport::{Connector, InboundFrame, Link, WsConnector};
