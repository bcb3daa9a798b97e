//! Package-level constants.

/// Current version of the client (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "master";

/// Endpoint of the core's event socket when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Number of transcript lines kept when nothing else is configured.
pub const DEFAULT_TRANSCRIPT_CAPACITY: usize = 5;
