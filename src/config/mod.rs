//! Configuration loading for the operations console.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `PIZZAOPS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const MIN_WEBHOOK_POLL_SECONDS: u64 = 5;
const MAX_WEBHOOK_POLL_SECONDS: u64 = 3600;
const MIN_NOTICE_TTL_SECONDS: u64 = 1;
const MAX_NOTICE_TTL_SECONDS: u64 = 60;

/// Application configuration derived from `PIZZAOPS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Base URL of the integration service, without a trailing slash
    #[serde(default = "default_integration_base_url")]
    pub integration_base_url: String,
    /// Bearer token attached to every integration call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Webhook monitor polling interval in seconds
    #[serde(default = "default_webhook_poll_seconds")]
    pub webhook_poll_seconds: u64,
    /// Lifetime of success notices in seconds
    #[serde(default = "default_notice_ttl_seconds")]
    pub notice_ttl_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            integration_base_url: default_integration_base_url(),
            api_token: None,
            webhook_poll_seconds: default_webhook_poll_seconds(),
            notice_ttl_seconds: default_notice_ttl_seconds(),
        }
    }
}

impl AppConfig {
    /// Returns the configured integration base URL parsed as a [`Url`].
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.integration_base_url)
    }

    /// Webhook monitor polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.webhook_poll_seconds)
    }

    /// Lifetime of success notices.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_seconds)
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.api_token.is_some() {
            config.api_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings
    /// are missing or out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Outside the local and test profiles the backend rejects anonymous
        // calls, so refuse to start without a token.
        if !matches!(self.profile.as_str(), "local" | "test") && self.api_token.is_none() {
            return Err(ConfigError::MissingApiToken);
        }

        if self.webhook_poll_seconds < MIN_WEBHOOK_POLL_SECONDS
            || self.webhook_poll_seconds > MAX_WEBHOOK_POLL_SECONDS
        {
            return Err(ConfigError::InvalidPollInterval {
                value: self.webhook_poll_seconds,
                min: MIN_WEBHOOK_POLL_SECONDS,
                max: MAX_WEBHOOK_POLL_SECONDS,
            });
        }

        if self.notice_ttl_seconds < MIN_NOTICE_TTL_SECONDS
            || self.notice_ttl_seconds > MAX_NOTICE_TTL_SECONDS
        {
            return Err(ConfigError::InvalidNoticeTtl {
                value: self.notice_ttl_seconds,
                min: MIN_NOTICE_TTL_SECONDS,
                max: MAX_NOTICE_TTL_SECONDS,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_integration_base_url() -> String {
    "http://localhost:8080/api/integrations".to_string()
}

fn default_webhook_poll_seconds() -> u64 {
    15
}

fn default_notice_ttl_seconds() -> u64 {
    5
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid integration base url '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("no api token configured; set PIZZAOPS_API_TOKEN")]
    MissingApiToken,
    #[error("webhook poll interval must be between {min} and {max} seconds, got {value}")]
    InvalidPollInterval { value: u64, min: u64, max: u64 },
    #[error("notice ttl must be between {min} and {max} seconds, got {value}")]
    InvalidNoticeTtl { value: u64, min: u64, max: u64 },
}

/// Loads configuration using layered `.env` files and `PIZZAOPS_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.<profile>`, and
    /// `.env.<profile>.local` in that order, then overlays process
    /// environment variables so they win.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("PIZZAOPS_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let integration_base_url = layered
            .remove("INTEGRATION_BASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_integration_base_url);
        let api_token = layered.remove("API_TOKEN").and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });
        let webhook_poll_seconds = layered
            .remove("WEBHOOK_POLL_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_webhook_poll_seconds);
        let notice_ttl_seconds = layered
            .remove("NOTICE_TTL_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_notice_ttl_seconds);

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            integration_base_url,
            api_token,
            webhook_poll_seconds,
            notice_ttl_seconds,
        };

        config.validate()?;

        match config.base_url() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBaseUrl {
                value: config.integration_base_url.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("PIZZAOPS_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("PIZZAOPS_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
