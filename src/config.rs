//! Client configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::gate::{GateConfig, GLOBAL_INTERVAL, KEY_FLOOR};
use crate::urls::{ApiHosts, API_HOST, IMAGE_HOST, STATIC_HOST};

const DEFAULT_USER_AGENT: &str = concat!("chan-mirror/", env!("CARGO_PKG_VERSION"));

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Use `https://` for every request.
    pub ssl: bool,

    pub api_host: String,
    pub image_host: String,
    pub static_host: String,

    /// Minimum spacing between any two requests.
    pub global_interval: Duration,

    /// Minimum time between two refreshes of the same thread. Anything
    /// under ten seconds is raised to ten seconds when used.
    pub update_cooldown: Duration,

    /// Timeout applied to each HTTP request.
    pub http_timeout: Duration,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ssl: true,
            api_host: API_HOST.to_string(),
            image_host: IMAGE_HOST.to_string(),
            static_host: STATIC_HOST.to_string(),
            global_interval: GLOBAL_INTERVAL,
            update_cooldown: Duration::from_secs(15),
            http_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `CHAN_SSL`: `true`/`false` (default: true)
    /// - `CHAN_API_HOST`, `CHAN_IMAGE_HOST`, `CHAN_STATIC_HOST`
    /// - `CHAN_GLOBAL_INTERVAL_MS`: global request spacing (default: 1000)
    /// - `CHAN_UPDATE_COOLDOWN_SECS`: per-thread refresh interval (default: 15)
    /// - `CHAN_HTTP_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `CHAN_USER_AGENT`
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self::from_vars(|key| std::env::var(key).ok())?;

        tracing::info!(
            ssl = config.ssl,
            api_host = %config.api_host,
            global_interval_ms = config.global_interval.as_millis() as u64,
            update_cooldown_secs = config.update_cooldown.as_secs(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Build a configuration from any variable source. Unset variables keep
    /// their defaults.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let host = |key: &str, default: String| {
            var(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Ok(Self {
            ssl: parse_var(&var, "CHAN_SSL")?.unwrap_or(defaults.ssl),
            api_host: host("CHAN_API_HOST", defaults.api_host),
            image_host: host("CHAN_IMAGE_HOST", defaults.image_host),
            static_host: host("CHAN_STATIC_HOST", defaults.static_host),
            global_interval: parse_var(&var, "CHAN_GLOBAL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.global_interval),
            update_cooldown: parse_var(&var, "CHAN_UPDATE_COOLDOWN_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.update_cooldown),
            http_timeout: parse_var(&var, "CHAN_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            user_agent: var("CHAN_USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            global_interval: self.global_interval,
            default_key_interval: self.update_cooldown,
            key_floor: KEY_FLOOR,
        }
    }

    pub fn hosts(&self) -> ApiHosts {
        ApiHosts {
            ssl: self.ssl,
            api: self.api_host.clone(),
            image: self.image_host.clone(),
            static_files: self.static_host.clone(),
        }
    }
}

fn parse_var<F, T>(var: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::Config(format!("invalid value {:?} for {}: {}", raw, key, e))
        }),
    }
}
