use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
    #[error("invalid config `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Upper bound for `access.token_ttl_secs` (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Production,
    Staging,
    #[default]
    Development,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        matches!(self, AppEnv::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppEnv::Production => "production",
            AppEnv::Staging => "staging",
            AppEnv::Development => "development",
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnv::Production),
            "staging" | "stage" => Ok(AppEnv::Staging),
            "development" | "dev" | "local" => Ok(AppEnv::Development),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_ms: u64,
    pub max_response_bytes: usize,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_response_bytes: 10 * 1024 * 1024,
            user_agent: concat!("bizunit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Connection settings for storage drivers. Values may be secret references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub rdb_url: Option<String>,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub clients: Vec<ClientConfig>,
    /// Lifetime of issued bearer tokens.
    pub token_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    /// Plain value or secret reference.
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Process-wide settings, built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub app_env: AppEnv,
    pub log: LogConfig,
    pub transport: TransportConfig,
    pub resources: ResourcesConfig,
    pub access: AccessConfig,
}

impl RuntimeConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    /// Read `path` (if given), then apply `BIZUNIT_*` environment overlays.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_yaml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only surface later as per-block failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "transport.timeout_ms",
                message: "must be greater than zero".into(),
            });
        }
        if self.transport.max_response_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "transport.max_response_bytes",
                message: "must be greater than zero".into(),
            });
        }
        if let Some(ttl) = self.access.token_ttl_secs {
            if ttl == 0 || ttl > MAX_TOKEN_TTL_SECS {
                return Err(ConfigError::Invalid {
                    field: "access.token_ttl_secs",
                    message: format!("must be between 1 and {MAX_TOKEN_TTL_SECS}"),
                });
            }
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BIZUNIT_ENV") {
            self.app_env = v.parse().map_err(|_| ConfigError::Env {
                name: "BIZUNIT_ENV",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("BIZUNIT_LOG") {
            self.log.level = v;
        }
        if let Some(v) = lookup("BIZUNIT_HTTP_TIMEOUT_MS") {
            self.transport.timeout_ms = v.parse().map_err(|_| ConfigError::Env {
                name: "BIZUNIT_HTTP_TIMEOUT_MS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("BIZUNIT_RDB_URL") {
            self.resources.rdb_url = Some(v);
        }
        if let Some(v) = lookup("BIZUNIT_REDIS_URL") {
            self.resources.redis_url = Some(v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn yaml_fills_defaults() {
        let cfg = RuntimeConfig::from_yaml_str("app_env: production\ntransport:\n  timeout_ms: 500\n")
            .unwrap();
        assert_eq!(cfg.app_env, AppEnv::Production);
        assert_eq!(cfg.transport.timeout_ms, 500);
        assert_eq!(cfg.transport.max_response_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn env_overlays_win() {
        let env: HashMap<&str, &str> = [
            ("BIZUNIT_ENV", "prod"),
            ("BIZUNIT_REDIS_URL", "redis://cache:6379"),
        ]
        .into_iter()
        .collect();
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(cfg.app_env.is_production());
        assert_eq!(cfg.resources.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut cfg = RuntimeConfig::default();
        let err = cfg
            .apply_env(|k| (k == "BIZUNIT_HTTP_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "BIZUNIT_HTTP_TIMEOUT_MS", .. }));
    }

    #[test]
    fn zero_timeout_is_a_config_error() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env(|k| (k == "BIZUNIT_HTTP_TIMEOUT_MS").then(|| "0".to_string()))
            .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "transport.timeout_ms", .. }));

        let cfg = RuntimeConfig::from_yaml_str("transport:\n  timeout_ms: 0\n").unwrap();
        assert!(cfg.validate().is_err());
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn token_ttl_is_bounded() {
        let cfg = RuntimeConfig::from_yaml_str("access:\n  token_ttl_secs: 18446744073709551615\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "access.token_ttl_secs", .. }));
    }
}
