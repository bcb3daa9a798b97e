//! Settings types with compiled defaults.

use std::time::Duration;

use master_core::constants::{DEFAULT_ENDPOINT, DEFAULT_TRANSCRIPT_CAPACITY};
use master_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings document (`~/.master/settings.json`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterSettings {
    /// Connection and presence timing.
    pub session: SessionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl MasterSettings {
    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()
    }
}

/// Connection lifecycle and presence timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// WebSocket URL of the core.
    pub endpoint: String,
    /// Period of the keepalive probe while connected.
    pub keepalive_interval_ms: u64,
    /// Delay before each reconnect attempt.
    pub reconnect_delay_ms: u64,
    /// How long Speaking may last without a `feedback.tts.end`.
    pub speaking_fallback_ms: u64,
    /// Upper bound on a single connect attempt.
    pub connect_timeout_ms: u64,
    /// Transcript lines kept.
    pub transcript_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            keepalive_interval_ms: 30_000,
            reconnect_delay_ms: 3_000,
            speaking_fallback_ms: 5_000,
            connect_timeout_ms: 10_000,
            transcript_capacity: DEFAULT_TRANSCRIPT_CAPACITY,
        }
    }
}

impl SessionSettings {
    /// Keepalive period.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Reconnect delay.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Speaking fallback timeout.
    pub fn speaking_fallback(&self) -> Duration {
        Duration::from_millis(self.speaking_fallback_ms)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(SettingsError::InvalidValue(format!(
                "endpoint must be a ws:// or wss:// URL, got {:?}",
                self.endpoint
            )));
        }
        // tokio intervals panic on a zero period
        if self.keepalive_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "keepaliveIntervalMs must be > 0".into(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "connectTimeoutMs must be > 0".into(),
            ));
        }
        if self.transcript_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "transcriptCapacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`) or a full
    /// `EnvFilter` directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
