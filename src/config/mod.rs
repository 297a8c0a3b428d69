//! Configuration loading for the job board service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `JOBBOARD_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "JOBBOARD_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `JOBBOARD_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_access_token_ttl_seconds")]
    pub access_token_ttl_seconds: u64,
    #[serde(default = "default_refresh_token_ttl_seconds")]
    pub refresh_token_ttl_seconds: u64,
    #[serde(default)]
    pub mail: MailConfig,
    /// Whether employer accounts may submit job applications
    #[serde(default)]
    pub employers_may_apply: bool,
}

/// Outbound mail relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MailConfig {
    /// HTTPS endpoint accepting `{from,to,subject,body}` JSON; mail is only
    /// logged when unset
    ///
    /// Environment variable: `JOBBOARD_MAIL_RELAY_URL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,

    /// Request timeout for the relay (default: 10)
    ///
    /// Environment variable: `JOBBOARD_MAIL_TIMEOUT_SECONDS`
    #[serde(default = "default_mail_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Attempts per message before giving up (default: 3)
    ///
    /// Environment variable: `JOBBOARD_MAIL_MAX_ATTEMPTS`
    #[serde(default = "default_mail_max_attempts")]
    pub max_attempts: u32,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            timeout_seconds: default_mail_timeout_seconds(),
            max_attempts: default_mail_max_attempts(),
        }
    }
}

impl MailConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(relay_url) = &self.relay_url {
            let parsed = url::Url::parse(relay_url).map_err(|e| ConfigError::InvalidMailRelayUrl {
                value: relay_url.clone(),
                reason: e.to_string(),
            })?;
            if parsed.scheme() != "https" {
                return Err(ConfigError::InvalidMailRelayUrl {
                    value: relay_url.clone(),
                    reason: "relay must use https".to_string(),
                });
            }
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 120 {
            return Err(ConfigError::InvalidMailTimeout {
                value: self.timeout_seconds,
            });
        }

        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ConfigError::InvalidMailAttempts {
                value: self.max_attempts,
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: None,
            access_token_ttl_seconds: default_access_token_ttl_seconds(),
            refresh_token_ttl_seconds: default_refresh_token_ttl_seconds(),
            mail: MailConfig::default(),
            employers_may_apply: false,
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// True for the `local` and `test` profiles, which relax secret requirements.
    pub fn is_development(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some(REDACTED.to_string());
        }
        // Relay URLs may embed credentials in the query string
        if config.mail.relay_url.is_some() {
            config.mail.relay_url = Some(REDACTED.to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: self.api_bind_addr.clone(),
                source,
            })?;

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        match &self.jwt_secret {
            None => return Err(ConfigError::MissingJwtSecret),
            Some(secret) if secret.is_empty() => return Err(ConfigError::MissingJwtSecret),
            Some(secret) if !self.is_development() && secret.len() < 32 => {
                return Err(ConfigError::WeakJwtSecret {
                    length: secret.len(),
                });
            }
            Some(_) => {}
        }

        if !(60..=86400).contains(&self.access_token_ttl_seconds) {
            return Err(ConfigError::InvalidAccessTokenTtl {
                value: self.access_token_ttl_seconds,
            });
        }

        if self.refresh_token_ttl_seconds <= self.access_token_ttl_seconds {
            return Err(ConfigError::InvalidRefreshTokenTtl {
                refresh: self.refresh_token_ttl_seconds,
                access: self.access_token_ttl_seconds,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        self.mail.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://jobboard.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_access_token_ttl_seconds() -> u64 {
    300 // 5 minutes
}

fn default_refresh_token_ttl_seconds() -> u64 {
    86400 // 1 day
}

fn default_mail_timeout_seconds() -> u64 {
    10
}

fn default_mail_max_attempts() -> u32 {
    3
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("database url is empty; set JOBBOARD_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("jwt secret is missing; set JOBBOARD_JWT_SECRET environment variable")]
    MissingJwtSecret,
    #[error("jwt secret must be at least 32 bytes outside local/test profiles, got {length}")]
    WeakJwtSecret { length: usize },
    #[error("access token ttl must be between 60 and 86400 seconds, got {value}")]
    InvalidAccessTokenTtl { value: u64 },
    #[error("refresh token ttl ({refresh}) must exceed access token ttl ({access})")]
    InvalidRefreshTokenTtl { refresh: u64, access: u64 },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("invalid mail relay url '{value}': {reason}")]
    InvalidMailRelayUrl { value: String, reason: String },
    #[error("mail timeout must be between 1 and 120 seconds, got {value}")]
    InvalidMailTimeout { value: u64 },
    #[error("mail max attempts must be between 1 and 10, got {value}")]
    InvalidMailAttempts { value: u32 },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Load and validate configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_non_empty(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_non_empty(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_parsed(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take_parsed(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let jwt_secret = take_non_empty(&mut layered, "JWT_SECRET");
        let access_token_ttl_seconds = take_parsed(&mut layered, "ACCESS_TOKEN_TTL_SECONDS")?
            .unwrap_or_else(default_access_token_ttl_seconds);
        let refresh_token_ttl_seconds = take_parsed(&mut layered, "REFRESH_TOKEN_TTL_SECONDS")?
            .unwrap_or_else(default_refresh_token_ttl_seconds);

        let mail = MailConfig {
            relay_url: take_non_empty(&mut layered, "MAIL_RELAY_URL"),
            timeout_seconds: take_parsed(&mut layered, "MAIL_TIMEOUT_SECONDS")?
                .unwrap_or_else(default_mail_timeout_seconds),
            max_attempts: take_parsed(&mut layered, "MAIL_MAX_ATTEMPTS")?
                .unwrap_or_else(default_mail_max_attempts),
        };

        let employers_may_apply = take_bool(&mut layered, "EMPLOYERS_MAY_APPLY")?.unwrap_or(false);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            mail,
            employers_may_apply,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
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
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
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

fn take_non_empty(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_parsed<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    take_non_empty(values, key)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            })
        })
        .transpose()
}

fn take_bool(values: &mut BTreeMap<String, String>, key: &str) -> Result<Option<bool>, ConfigError> {
    take_non_empty(values, key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        })
        .transpose()
}
