//! Listener configuration.
//!
//! Loaded once at startup in priority order (highest first):
//! 1. Environment variables prefixed `LISTENER_`, nested keys split on `__`
//!    (e.g. `LISTENER_RELAY__API_KEY`)
//! 2. `listener.toml` in the working directory
//! 3. Built-in defaults
//!
//! The resulting value is immutable and shared with handlers through the
//! router state.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "listener.toml";
const ENV_PREFIX: &str = "LISTENER_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest request body accepted, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Settings for forwarding captured payloads to the conversation API.
/// The relay is active only when `api_key` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_relay_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_selected_branch")]
    pub selected_branch: String,
    #[serde(default = "default_integration_provider")]
    pub integration_provider: String,
    #[serde(default = "default_branch_name")]
    pub branch_name: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Replaces the built-in instruction template.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    /// Unset keeps the HTTP client's own default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn server_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid server address {}:{}", self.host, self.port))
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be greater than 0");
        }
        if self.body_limit_bytes == 0 {
            bail!("body_limit_bytes must be greater than 0");
        }
        if self.relay.enabled() && self.relay.repository().is_none() {
            bail!("relay.repository must be set when relay.api_key is configured");
        }
        if self.relay.timeout_seconds == Some(0) {
            bail!("relay.timeout_seconds must be greater than 0");
        }
        Ok(())
    }
}

impl RelayConfig {
    /// API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn enabled(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref().filter(|repo| !repo.trim().is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            log_filter: default_log_filter(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_relay_base_url(),
            repository: None,
            selected_branch: default_selected_branch(),
            integration_provider: default_integration_provider(),
            branch_name: default_branch_name(),
            file_name: default_file_name(),
            template_path: None,
            timeout_seconds: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

fn default_log_filter() -> String {
    "info,webhook_listener=debug,tower_http=info".to_string()
}

fn default_relay_base_url() -> String {
    "https://app.all-hands.dev".to_string()
}

fn default_selected_branch() -> String {
    "main".to_string()
}

fn default_integration_provider() -> String {
    "ngrok".to_string()
}

fn default_branch_name() -> String {
    "webhook-events".to_string()
}

fn default_file_name() -> String {
    "events/webhook_events.md".to_string()
}
