//! Configuration management for Courier
//!
//! Configuration comes from defaults, a TOML file, or `COURIER_*` environment
//! variables, and is validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod error;
mod feature_flags;

pub use error::ConfigError;
pub use feature_flags::{FeatureFlags, FeatureManager};

/// Main client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Network selection
    pub api: ApiConfig,

    /// Auth token policy
    pub auth: AuthConfig,

    /// Remote attachment fetching
    pub attachments: AttachmentConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Feature flags
    pub features: FeatureFlags,
}

/// Which network the client talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Production,
    Local,
}

impl Environment {
    /// Host and port of the envelope store for this environment
    pub fn host(&self) -> &'static str {
        match self {
            Environment::Dev => "dev.courier.network:5556",
            Environment::Production => "production.courier.network:5556",
            Environment::Local => "localhost:5556",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Dev => "dev",
            Environment::Production => "production",
            Environment::Local => "local",
        })
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "production" | "prod" => Ok(Environment::Production),
            "local" => Ok(Environment::Local),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: {}",
                other
            ))),
        }
    }
}

/// Network options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Network to connect to
    pub env: Environment,

    /// Whether the transport should use TLS. Only `false` for `local`.
    pub is_secure: bool,

    /// Self-reported application version, e.g. `MyInbox/v1.0.0`
    pub app_version: Option<String>,
}

impl ApiConfig {
    /// Envelope store url; the scheme follows `is_secure`
    pub fn endpoint(&self) -> String {
        let scheme = if self.is_secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.env.host())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            is_secure: true,
            app_version: None,
        }
    }
}

/// Auth token policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Tokens older than this are rejected by verifiers
    #[serde(with = "humantime_serde")]
    pub token_max_age: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_max_age: Duration::from_secs(60 * 60),
        }
    }
}

/// Remote attachment fetch settings, used by the HTTP fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,

    /// Upper bound on a fetched payload
    pub max_payload_bytes: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_payload_bytes: 100 * 1024 * 1024, // 100 MB
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, what: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: COURIER_<SECTION>_<KEY>
    /// Example: COURIER_API_ENV=production
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(env) = parse_env::<Environment>("COURIER_API_ENV", "environment")? {
            config.api.env = env;
        }
        if let Some(secure) = parse_env::<bool>("COURIER_API_IS_SECURE", "TLS flag")? {
            config.api.is_secure = secure;
        }
        if let Ok(version) = env::var("COURIER_API_APP_VERSION") {
            config.api.app_version = Some(version);
        }

        if let Some(raw) = parse_env::<humantime::Duration>("COURIER_AUTH_TOKEN_MAX_AGE", "token max age")? {
            config.auth.token_max_age = raw.into();
        }

        if let Some(raw) =
            parse_env::<humantime::Duration>("COURIER_ATTACHMENTS_FETCH_TIMEOUT", "fetch timeout")?
        {
            config.attachments.fetch_timeout = raw.into();
        }
        if let Some(max) =
            parse_env::<usize>("COURIER_ATTACHMENTS_MAX_PAYLOAD_BYTES", "max payload bytes")?
        {
            config.attachments.max_payload_bytes = max;
        }

        if let Ok(level) = env::var("COURIER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = parse_env::<bool>("COURIER_LOG_JSON", "JSON flag")? {
            config.logging.json_format = json;
        }

        if let Some(group_chat) = parse_env::<bool>("COURIER_FEATURES_GROUP_CHAT", "group chat flag")? {
            config.features.group_chat = group_chat;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.is_secure && self.api.env != Environment::Local {
            return Err(ConfigError::ValidationFailed(format!(
                "insecure transport is only allowed for the local environment, not {}",
                self.api.env
            )));
        }

        if self.auth.token_max_age.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "token_max_age must be greater than 0".to_string(),
            ));
        }

        if self.attachments.max_payload_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_payload_bytes must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.env, Environment::Dev);
        assert!(config.api.is_secure);
    }

    #[test]
    fn test_insecure_only_for_local() {
        let mut config = Config::default();
        config.api.is_secure = false;
        assert!(config.validate().is_err());

        config.api.env = Environment::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("LOCAL".parse::<Environment>().unwrap(), Environment::Local);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_endpoint_follows_security() {
        let mut api = ApiConfig::default();
        assert_eq!(api.endpoint(), "https://dev.courier.network:5556");

        api.env = Environment::Local;
        api.is_secure = false;
        assert_eq!(api.endpoint(), "http://localhost:5556");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.toml");

        let mut config = Config::default();
        config.api.env = Environment::Production;
        config.api.app_version = Some("Inbox/v1.0.0".to_string());
        config.attachments.fetch_timeout = Duration::from_secs(5);
        config.features.group_chat = true;

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.toml");

        let mut config = Config::default();
        config.logging.level = "chatty".to_string();
        config.save_to_file(&path).unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ValidationFailed(_))
        ));
    }
}
