//! Courier configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CourierError, Result};

/// Margin added to the delivery timeout to bound a whole tick.
pub const TICK_TIMEOUT_MARGIN_SECS: u64 = 10;

const FALLBACK_INTERVAL_SECS: i64 = 120;
const FALLBACK_MAX_PER_TICK: i64 = 2;
const FALLBACK_CHAR_LIMIT: i64 = 160;
const FALLBACK_TIMEOUT_SECS: i64 = 30;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl CourierConfig {
    /// Load config from the default path, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CourierError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CourierError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Courier home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".courier")
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let num = |key: &str| get(key).and_then(|v| v.trim().parse::<i64>().ok());

        if let Some(port) = get("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.gateway.port = port;
        }
        if let Some(key) = get("API_KEY") {
            self.gateway.api_key = key;
        }
        if let Some(v) = num("SCHEDULE_SECONDS") {
            self.scheduler.interval_secs = v;
        }
        if let Some(v) = num("MSG_PER_TICK") {
            self.scheduler.max_per_tick = v;
        }
        if let Some(v) = num("MSG_CHAR_LIMIT") {
            self.scheduler.char_limit = v;
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Some(key) = get("WEBHOOK_AUTH_KEY") {
            self.webhook.auth_key = Some(key);
        }
        if let Some(v) = num("WEBHOOK_TIMEOUT_SECONDS") {
            self.webhook.timeout_secs = v;
        }
        if let Some(path) = get("DB_PATH") {
            self.database.path = path;
        }
    }
}

/// HTTP control surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Empty disables API-key checks.
    #[serde(default)]
    pub api_key: String,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8080 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: String::new(),
        }
    }
}

/// Dispatch scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: i64,
    #[serde(default = "default_max_per_tick")]
    pub max_per_tick: i64,
    #[serde(default = "default_char_limit")]
    pub char_limit: i64,
    /// Start the scheduler at boot instead of waiting for a start command.
    #[serde(default)]
    pub autostart: bool,
}

fn default_interval_secs() -> i64 { FALLBACK_INTERVAL_SECS }
fn default_max_per_tick() -> i64 { FALLBACK_MAX_PER_TICK }
fn default_char_limit() -> i64 { FALLBACK_CHAR_LIMIT }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_per_tick: default_max_per_tick(),
            char_limit: default_char_limit(),
            autostart: false,
        }
    }
}

impl SchedulerConfig {
    /// Effective tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(positive_or(self.interval_secs, FALLBACK_INTERVAL_SECS))
    }

    /// Effective batch size.
    pub fn max_per_tick(&self) -> usize {
        positive_or(self.max_per_tick, FALLBACK_MAX_PER_TICK) as usize
    }

    /// Effective per-message character limit.
    pub fn char_limit(&self) -> usize {
        positive_or(self.char_limit, FALLBACK_CHAR_LIMIT) as usize
    }
}

/// Outbound webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    /// Sent as `x-ins-auth-key` when present.
    #[serde(default)]
    pub auth_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: i64,
    /// Remote ids treated as "no id supplied".
    #[serde(default = "default_placeholder_ids")]
    pub placeholder_ids: Vec<String>,
}

fn default_timeout_secs() -> i64 { FALLBACK_TIMEOUT_SECS }
fn default_placeholder_ids() -> Vec<String> { vec!["{{uuid}}".into()] }

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_key: None,
            timeout_secs: default_timeout_secs(),
            placeholder_ids: default_placeholder_ids(),
        }
    }
}

impl WebhookConfig {
    /// Effective per-request timeout.
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(positive_or(self.timeout_secs, FALLBACK_TIMEOUT_SECS))
    }

    /// Bound for a whole tick: delivery timeout plus a fixed margin.
    pub fn tick_timeout(&self) -> Duration {
        self.delivery_timeout() + Duration::from_secs(TICK_TIMEOUT_MARGIN_SECS)
    }
}

/// Message store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.courier/messages.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn positive_or(value: i64, fallback: i64) -> u64 {
    if value > 0 { value as u64 } else { fallback as u64 }
}
