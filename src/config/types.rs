//! Core configuration types and loading.

use serde::Deserialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The single identity allowed to issue lock commands.
    pub operator: OperatorConfig,
    /// Lock enforcement policy.
    #[serde(default)]
    pub lock: LockConfig,
    /// Keepalive and session backup timers.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Session-state file.
    #[serde(default)]
    pub session: SessionConfig,
    /// Platform bridge connection.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Health-check / metrics HTTP listener.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment (`PORT`).
    pub fn apply_env_overrides(&mut self) {
        self.http.apply_port_override(std::env::var("PORT").ok().as_deref());
    }
}

/// Operator identity.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    /// Platform user ID of the operator. Directives from anyone else are ignored.
    pub uid: String,
}

/// Nickname / title lock policy.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// Nickname applied to every member by `/nicklock on`.
    #[serde(default = "default_nickname")]
    pub default_nickname: String,
    /// Corrections per thread before a cooldown starts (default: 60).
    #[serde(default = "default_violation_threshold")]
    pub violation_threshold: u32,
    /// Seconds corrections stay suppressed once a cooldown starts (default: 180).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Lower bound of the randomized delay between renames, inclusive (default: 1800).
    #[serde(default = "default_pacing_min_ms")]
    pub pacing_min_ms: u64,
    /// Upper bound of the randomized delay between renames, exclusive (default: 3200).
    #[serde(default = "default_pacing_max_ms")]
    pub pacing_max_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_nickname: default_nickname(),
            violation_threshold: default_violation_threshold(),
            cooldown_secs: default_cooldown_secs(),
            pacing_min_ms: default_pacing_min_ms(),
            pacing_max_ms: default_pacing_max_ms(),
        }
    }
}

impl LockConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Half-open range the per-action pacing delay is drawn from.
    pub fn pacing_range(&self) -> Range<Duration> {
        Duration::from_millis(self.pacing_min_ms)..Duration::from_millis(self.pacing_max_ms)
    }
}

/// Periodic side tasks sharing the warden's event loop.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Seconds between presence pings to tracked threads (default: 300).
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Seconds between session-state backups (default: 600).
    #[serde(default = "default_backup_secs")]
    pub backup_secs: u64,
    /// Milliseconds the typing indicator stays on during a ping (default: 1500).
    #[serde(default = "default_typing_hold_ms")]
    pub typing_hold_ms: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            backup_secs: default_backup_secs(),
            typing_hold_ms: default_typing_hold_ms(),
        }
    }
}

impl MaintenanceConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_secs(self.backup_secs)
    }

    pub fn typing_hold(&self) -> Duration {
        Duration::from_millis(self.typing_hold_ms)
    }
}

/// Session-state persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// File the session state is read from at startup and backed up to.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

/// Connection to the platform bridge sidecar.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// `host:port` of the bridge.
    #[serde(default = "default_bridge_addr")]
    pub bridge_addr: String,
    /// Capacity of the inbound event feed (default: 256).
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            bridge_addr: default_bridge_addr(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Health-check HTTP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Listen port (default: 3000). 0 disables the listener.
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
        }
    }
}

impl HttpConfig {
    /// Replace the port with an environment-provided value, if it parses.
    pub fn apply_port_override(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.port = port,
            Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid PORT override"),
        }
    }
}

fn default_nickname() -> String {
    "🔒 Locked".to_string()
}

fn default_violation_threshold() -> u32 {
    60
}

fn default_cooldown_secs() -> u64 {
    180
}

fn default_pacing_min_ms() -> u64 {
    1800
}

fn default_pacing_max_ms() -> u64 {
    3200
}

fn default_keepalive_secs() -> u64 {
    300
}

fn default_backup_secs() -> u64 {
    600
}

fn default_typing_hold_ms() -> u64 {
    1500
}

fn default_session_path() -> PathBuf {
    PathBuf::from("appstate.json")
}

fn default_bridge_addr() -> String {
    "127.0.0.1:7300".to_string()
}

fn default_event_buffer() -> usize {
    256
}

fn default_http_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[operator]
uid = "61578631626802"
"#,
        )
        .unwrap();

        assert_eq!(config.operator.uid, "61578631626802");
        assert_eq!(config.lock.violation_threshold, 60);
        assert_eq!(config.lock.cooldown(), Duration::from_secs(180));
        assert_eq!(
            config.lock.pacing_range(),
            Duration::from_millis(1800)..Duration::from_millis(3200)
        );
        assert_eq!(config.maintenance.keepalive_interval(), Duration::from_secs(300));
        assert_eq!(config.maintenance.backup_interval(), Duration::from_secs(600));
        assert_eq!(config.session.path, PathBuf::from("appstate.json"));
        assert_eq!(config.http.port, 3000);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: Config = toml::from_str(
            r#"
[operator]
uid = "op"

[lock]
default_nickname = "guard"
violation_threshold = 5
pacing_min_ms = 10
pacing_max_ms = 20

[http]
port = 0
"#,
        )
        .unwrap();

        assert_eq!(config.lock.default_nickname, "guard");
        assert_eq!(config.lock.violation_threshold, 5);
        assert_eq!(config.lock.cooldown_secs, 180);
        assert_eq!(config.http.port, 0);
    }

    #[test]
    fn missing_operator_fails_to_parse() {
        assert!(toml::from_str::<Config>("[lock]\nviolation_threshold = 3\n").is_err());
    }

    #[test]
    fn port_override_applies_only_when_valid() {
        let mut http = HttpConfig::default();
        http.apply_port_override(Some("8080"));
        assert_eq!(http.port, 8080);

        http.apply_port_override(Some("not-a-port"));
        assert_eq!(http.port, 8080);

        http.apply_port_override(None);
        assert_eq!(http.port, 8080);
    }
}
