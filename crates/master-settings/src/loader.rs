//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MasterSettings::default()`]
//! 2. If `~/.master/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `MASTER_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::MasterSettings;

/// Override for the core endpoint URL.
pub const ENV_CORE_URL: &str = "MASTER_CORE_URL";
/// Override for the keepalive period.
pub const ENV_KEEPALIVE_MS: &str = "MASTER_KEEPALIVE_MS";
/// Override for the reconnect delay.
pub const ENV_RECONNECT_DELAY_MS: &str = "MASTER_RECONNECT_DELAY_MS";
/// Override for the speaking fallback timeout.
pub const ENV_SPEAKING_FALLBACK_MS: &str = "MASTER_SPEAKING_FALLBACK_MS";
/// Override for the connect timeout.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "MASTER_CONNECT_TIMEOUT_MS";
/// Override for the transcript capacity.
pub const ENV_TRANSCRIPT_CAPACITY: &str = "MASTER_TRANSCRIPT_CAPACITY";
/// Override for the log level.
pub const ENV_LOG_LEVEL: &str = "MASTER_LOG_LEVEL";

/// Resolve the path to the settings file (`~/.master/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".master").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MasterSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid merged value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<MasterSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, reading overrides through `env`.
pub fn load_with_env<F>(path: &Path, env: F) -> Result<MasterSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(MasterSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MasterSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `env`.
///
/// Numbers must parse and fall within range; invalid values are ignored
/// with a warning and the file/default value stays.
pub fn apply_env_overrides<F>(settings: &mut MasterSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let session = &mut settings.session;
    if let Some(v) = read_string(&env, ENV_CORE_URL) {
        session.endpoint = v;
    }
    if let Some(v) = read_u64(&env, ENV_KEEPALIVE_MS, 1_000, 3_600_000) {
        session.keepalive_interval_ms = v;
    }
    if let Some(v) = read_u64(&env, ENV_RECONNECT_DELAY_MS, 0, 600_000) {
        session.reconnect_delay_ms = v;
    }
    if let Some(v) = read_u64(&env, ENV_SPEAKING_FALLBACK_MS, 0, 600_000) {
        session.speaking_fallback_ms = v;
    }
    if let Some(v) = read_u64(&env, ENV_CONNECT_TIMEOUT_MS, 100, 600_000) {
        session.connect_timeout_ms = v;
    }
    if let Some(v) = read_u64(&env, ENV_TRANSCRIPT_CAPACITY, 1, 1_000) {
        // bounded above, always fits
        session.transcript_capacity = usize::try_from(v).unwrap_or(session.transcript_capacity);
    }
    if let Some(v) = read_string(&env, ENV_LOG_LEVEL) {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_string<F>(env: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(name).filter(|v| !v.is_empty())
}

fn read_u64<F>(env: &F, name: &str, min: u64, max: u64) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let val = env(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid numeric env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write as _;

    use super::*;
    use crate::errors::SettingsError;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"session": {"endpoint": "ws://a", "reconnectDelayMs": 3000}});
        let source = serde_json::json!({"session": {"endpoint": "ws://b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["session"]["endpoint"], "ws://b");
        assert_eq!(merged["session"]["reconnectDelayMs"], 3000);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_with_env(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(settings, MasterSettings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_settings(
            r#"{"session": {"endpoint": "ws://10.0.0.2:8000/ws", "reconnectDelayMs": 500}}"#,
        );
        let settings = load_with_env(file.path(), no_env).unwrap();
        assert_eq!(settings.session.endpoint, "ws://10.0.0.2:8000/ws");
        assert_eq!(settings.session.reconnect_delay_ms, 500);
        assert_eq!(settings.session.keepalive_interval_ms, 30_000);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let file = write_settings("{not json");
        let err = load_with_env(file.path(), no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn invalid_merged_value_is_an_error() {
        let file = write_settings(r#"{"session": {"keepaliveIntervalMs": 0}}"#);
        let err = load_with_env(file.path(), no_env).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_file() {
        let file = write_settings(r#"{"session": {"endpoint": "ws://file/ws"}}"#);
        let env = env_from(&[
            (ENV_CORE_URL, "ws://env/ws"),
            (ENV_RECONNECT_DELAY_MS, "250"),
            (ENV_LOG_LEVEL, "debug"),
        ]);
        let settings = load_with_env(file.path(), env).unwrap();
        assert_eq!(settings.session.endpoint, "ws://env/ws");
        assert_eq!(settings.session.reconnect_delay_ms, 250);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn out_of_range_env_is_ignored() {
        let mut settings = MasterSettings::default();
        apply_env_overrides(
            &mut settings,
            env_from(&[(ENV_KEEPALIVE_MS, "5"), (ENV_TRANSCRIPT_CAPACITY, "0")]),
        );
        assert_eq!(settings.session.keepalive_interval_ms, 30_000);
        assert_eq!(settings.session.transcript_capacity, 5);
    }

    #[test]
    fn empty_string_env_is_ignored() {
        let mut settings = MasterSettings::default();
        apply_env_overrides(&mut settings, env_from(&[(ENV_CORE_URL, "")]));
        assert_eq!(settings.session.endpoint, "ws://localhost:8000/ws");
    }

    #[test]
    fn transcript_capacity_env_applies() {
        let mut settings = MasterSettings::default();
        apply_env_overrides(&mut settings, env_from(&[(ENV_TRANSCRIPT_CAPACITY, "12")]));
        assert_eq!(settings.session.transcript_capacity, 12);
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("3000", 0, 5000), Some(3000));
        assert_eq!(parse_u64_range(" 42 ", 0, 100), Some(42));
        assert_eq!(parse_u64_range("5001", 0, 5000), None);
        assert_eq!(parse_u64_range("-1", 0, 5000), None);
        assert_eq!(parse_u64_range("abc", 0, 5000), None);
    }

    #[test]
    fn settings_path_ends_with_master_dir() {
        let path = settings_path();
        assert!(path.ends_with(".master/settings.json"));
    }
}
