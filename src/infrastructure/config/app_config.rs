//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DEFAULT_TTL_DAYS, Transformations, parse_token, ttl_from_days};
use crate::infrastructure::image::CdnConfig;
use crate::infrastructure::image::cdn::{DEFAULT_CLOUD_NAME, DEFAULT_HOST};
use crate::infrastructure::image::fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::infrastructure::image::store::CacheStore;

use super::args::CliArgs;
use super::storage::ConfigError;

pub(super) const APP_NAME: &str = "folio-media";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "folio";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from TOML and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// CDN addressing.
    #[serde(default)]
    pub cdn: CdnSettings,

    /// Local cache store.
    #[serde(default)]
    pub cache: CacheSettings,

    /// HTTP retrieval.
    #[serde(default)]
    pub network: NetworkSettings,
}

/// CDN configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnSettings {
    /// CDN host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Account (cloud) name.
    #[serde(default = "default_cloud_name")]
    pub cloud_name: String,

    /// Base transformations as ordered `key_value` tokens.
    #[serde(default = "default_transformation_tokens")]
    pub default_transformations: Vec<String>,
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            cloud_name: default_cloud_name(),
            default_transformations: default_transformation_tokens(),
        }
    }
}

impl CdnSettings {
    /// Resolves the settings into a [`CdnConfig`].
    ///
    /// # Errors
    /// Returns `ConfigError` if a transformation token is malformed.
    pub fn to_cdn_config(&self) -> Result<CdnConfig, ConfigError> {
        let default_transformations = self
            .default_transformations
            .iter()
            .map(|token| parse_token(token))
            .collect::<Result<Transformations, _>>()?;

        Ok(CdnConfig {
            host: self.host.clone(),
            cloud_name: self.cloud_name.clone(),
            default_transformations,
        })
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Store directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Entry time-to-live in days.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: None,
            ttl_days: DEFAULT_TTL_DAYS,
        }
    }
}

impl CacheSettings {
    /// Returns effective store directory.
    #[must_use]
    pub fn effective_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(CacheStore::default_location)
    }

    /// Returns entry time-to-live.
    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        ttl_from_days(self.ttl_days)
    }
}

/// HTTP configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header sent with requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkSettings {
    /// Returns request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_cloud_name() -> String {
    DEFAULT_CLOUD_NAME.to_string()
}

fn default_transformation_tokens() -> Vec<String> {
    CdnConfig::default_transformations().to_tokens()
}

const fn default_ttl_days() -> u32 {
    DEFAULT_TTL_DAYS
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.directory = Some(cache_dir.clone());
        }
        if let Some(ttl_days) = args.ttl_days {
            self.cache.ttl_days = ttl_days;
        }
        if let Some(cloud_name) = &args.cloud_name {
            self.cdn.cloud_name.clone_from(cloud_name);
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.network.timeout_secs = timeout_secs;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            cdn: CdnSettings::default(),
            cache: CacheSettings::default(),
            network: NetworkSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TransformKey;
    use clap::Parser;

    #[test]
    fn test_parse_config_sections() {
        let toml_content = r#"
            log_level = "debug"

            [cdn]
            cloud_name = "portfolio"
            default_transformations = ["f_auto", "q_auto:best"]

            [cache]
            ttl_days = 7

            [network]
            timeout_secs = 5
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.cdn.host, DEFAULT_HOST);
        assert_eq!(config.cache.ttl(), TimeDelta::days(7));
        assert_eq!(config.network.timeout(), Duration::from_secs(5));
        assert_eq!(config.network.user_agent, DEFAULT_USER_AGENT);

        let cdn = config.cdn.to_cdn_config().unwrap();
        assert_eq!(cdn.base_url(), "https://res.cloudinary.com/portfolio/image/upload");
        assert_eq!(cdn.default_transformations.to_string(), "f_auto,q_auto:best");
    }

    #[test]
    fn test_default_cdn_settings_match_builder_defaults() {
        let cdn = CdnSettings::default().to_cdn_config().unwrap();
        assert_eq!(cdn, CdnConfig::default());
        assert!(cdn.default_transformations.contains_key(TransformKey::Flags));
    }

    #[test]
    fn test_invalid_transformation_token_rejected() {
        let settings = CdnSettings {
            default_transformations: vec!["nonsense".to_string()],
            ..CdnSettings::default()
        };
        assert!(matches!(
            settings.to_cdn_config(),
            Err(ConfigError::InvalidTransformation(_))
        ));
    }

    #[test]
    fn test_merge_with_args() {
        let args = CliArgs::parse_from([
            "folio-media",
            "--log-level",
            "warn",
            "--cache-dir",
            "/tmp/folio",
            "--ttl-days",
            "1",
            "--cloud-name",
            "other",
            "clear",
        ]);
        let mut config = AppConfig::default();

        config.merge_with_args(&args);

        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.cache.effective_directory(), PathBuf::from("/tmp/folio"));
        assert_eq!(config.cache.ttl_days, 1);
        assert_eq!(config.cdn.cloud_name, "other");
        assert_eq!(config.network.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }
}
