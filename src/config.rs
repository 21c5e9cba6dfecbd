//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::session_registry::DEFAULT_MAX_ATTEMPTS;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVE_QNA_CONFIG_PATH";

const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_SEND_COOLDOWN_MS: u64 = 10_000;
const DEFAULT_SSE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Period between two ledger reloads of a sync client.
    pub poll_interval: Duration,
    /// Window after an accepted send during which further sends are dropped.
    pub send_cooldown: Duration,
    /// Insert attempts before session creation gives up.
    pub max_join_code_attempts: u32,
    /// Buffer of the change feed and of each SSE subscriber.
    pub sse_capacity: usize,
    /// Whether sync clients also reload on change notifications besides polling.
    pub push_updates: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), ?config, "loaded config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; absent keys take their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    poll_interval_ms: u64,
    send_cooldown_ms: u64,
    max_join_code_attempts: u32,
    sse_capacity: usize,
    push_updates: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            send_cooldown_ms: DEFAULT_SEND_COOLDOWN_MS,
            max_join_code_attempts: DEFAULT_MAX_ATTEMPTS,
            sse_capacity: DEFAULT_SSE_CAPACITY,
            push_updates: true,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            // A zero period would make tokio's interval panic.
            poll_interval: Duration::from_millis(raw.poll_interval_ms.max(1)),
            send_cooldown: Duration::from_millis(raw.send_cooldown_ms),
            max_join_code_attempts: raw.max_join_code_attempts.max(1),
            sse_capacity: raw.sse_capacity.max(1),
            push_updates: raw.push_updates,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
