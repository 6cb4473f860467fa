//! Configuration management for sqlalert
//!
//! This module defines the main `Config` struct and its sub-structs. Values
//! are layered with `figment`: built-in defaults, an optional TOML file,
//! `SQLALERT_` environment variables and finally the command-line flags.
//! The result is validated once and then passed by reference; nothing reads
//! configuration from globals.

use crate::cli::Cli;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Channel the database side sends `NOTIFY` on.
pub const DEFAULT_CHANNEL: &str = "sql_alert";

/// Seconds without a notification before the listener is pinged.
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 90;

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("missing required flag -{0}")]
    Missing(&'static str),

    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("invalid channel name '{0}'")]
    InvalidChannel(String),

    #[error("liveness.idle_timeout_seconds must be greater than zero")]
    ZeroIdleTimeout,
}

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// The database to subscribe to.
    pub database: DatabaseConfig,
    /// The webhook alerts are forwarded to.
    pub webhook: WebhookConfig,
    /// Idle detection for the subscription.
    pub liveness: LivenessConfig,
}

/// Configuration for the notification listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (URL or key/value form).
    pub dsn: String,
    /// The channel to `LISTEN` on.
    pub channel: String,
}

/// Configuration for the alert forwarder.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct WebhookConfig {
    /// The DingTalk robot webhook URL.
    pub url: String,
    /// Optional bound on each webhook request. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Configuration for liveness probing.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LivenessConfig {
    /// Seconds of inactivity before a probe is dispatched.
    pub idle_timeout_seconds: u64,
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// Precedence, lowest first: defaults, the `--config` TOML file,
    /// `SQLALERT_*` environment variables, command-line flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. SQLALERT_WEBHOOK__URL=https://...
            .merge(Env::prefixed("SQLALERT_").split("__"))
            .merge(cli.clone())
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the relay relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.dsn.trim().is_empty() {
            return Err(ConfigError::Missing("dsn"));
        }
        if self.webhook.url.trim().is_empty() {
            return Err(ConfigError::Missing("dingdingURL"));
        }

        let url = Url::parse(&self.webhook.url).map_err(|e| ConfigError::InvalidWebhookUrl {
            url: self.webhook.url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidWebhookUrl {
                url: self.webhook.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let channel = &self.database.channel;
        if channel.is_empty() || channel.len() > MAX_IDENTIFIER_LEN || channel.contains('\0') {
            return Err(ConfigError::InvalidChannel(channel.clone()));
        }

        if self.liveness.idle_timeout_seconds == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness.idle_timeout_seconds)
    }

    pub fn webhook_timeout(&self) -> Option<Duration> {
        self.webhook.timeout_seconds.map(Duration::from_secs)
    }
}

impl DatabaseConfig {
    /// The DSN with any password masked, for logging.
    pub fn redacted_dsn(&self) -> String {
        redact_dsn(&self.dsn)
    }
}

impl WebhookConfig {
    /// The webhook URL without its query string, which carries the access token.
    pub fn redacted_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.query().is_some() {
                    url.set_query(Some("****"));
                }
                url.to_string()
            }
            Err(_) => self.url.clone(),
        }
    }
}

/// Masks the password in a URL-style or key/value connection string.
pub fn redact_dsn(dsn: &str) -> String {
    if let Ok(mut url) = Url::parse(dsn) {
        if url.password().is_some() && url.set_password(Some("****")).is_ok() {
            return url.to_string();
        }
        return dsn.to_string();
    }

    dsn.split_whitespace()
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{}=****", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            database: DatabaseConfig {
                dsn: String::new(),
                channel: DEFAULT_CHANNEL.to_string(),
            },
            webhook: WebhookConfig::default(),
            liveness: LivenessConfig {
                idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
            },
        }
    }
}
