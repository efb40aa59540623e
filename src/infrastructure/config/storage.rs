use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{info, warn};

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use crate::domain::entities::TransformParseError;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("invalid default transformation: {0}")]
    InvalidTransformation(#[from] TransformParseError),
}

pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Create a new `StorageManager`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    /// Creates a new `StorageManager` with a specific directory (useful for testing).
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Loads the application configuration.
    ///
    /// A missing file yields the defaults, which are written out for the
    /// user to edit. A file that does not parse is ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let config_path = path_override.map_or_else(
            || self.config_dir.join(CONFIG_FILE_NAME),
            Path::to_path_buf,
        );

        if !config_path.exists() {
            info!(
                "Config file not found at {:?}, creating default.",
                config_path
            );
            let default_config = AppConfig::default();
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            Self::save_to_file(&config_path, &default_config)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path)?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                Ok(AppConfig::default())
            }
        }
    }

    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;

        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_writes_default() {
        let temp = TempDir::new().unwrap();
        let manager = StorageManager::with_dir(temp.path().join("conf"));

        let config = manager.load_config(None).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(temp.path().join("conf").join(CONFIG_FILE_NAME).exists());

        let reloaded = manager.load_config(None).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_default_write_leaves_only_config_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("conf");
        let manager = StorageManager::with_dir(dir.clone());

        manager.load_config(None).unwrap();

        let names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(CONFIG_FILE_NAME)]);

        let written = fs::read_to_string(dir.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(toml::from_str::<AppConfig>(&written).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let mut config = AppConfig::default();
        config.cache.ttl_days = 9;

        StorageManager::save_to_file(&path, &config).unwrap();

        let reloaded = StorageManager::with_dir(temp.path().to_path_buf())
            .load_config(None)
            .unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_override_path_is_used() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[cache]\nttl_days = 2\n").unwrap();
        let manager = StorageManager::with_dir(temp.path().join("unused"));

        let config = manager.load_config(Some(&path)).unwrap();

        assert_eq!(config.cache.ttl_days, 2);
        assert!(!temp.path().join("unused").exists());
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        fs::write(&path, "[cache\nttl_days = ").unwrap();
        let manager = StorageManager::with_dir(temp.path().to_path_buf());

        let config = manager.load_config(Some(&path)).unwrap();

        assert_eq!(config, AppConfig::default());
    }
}
