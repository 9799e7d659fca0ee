//! Configuration management for incident-report.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "incident-report";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "state.db";

/// Storage key the report document is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "reportingFormData";

/// Largest accepted upload, in bytes (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Path of the body diagram asset recorded with each marker.
pub const DEFAULT_DIAGRAM_IMAGE_URL: &str = "/human.jpg";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `INCIDENT_REPORT_`, sections split on `__`)
/// 2. TOML config file at `~/.config/incident-report/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Upload widget configuration.
    pub upload: UploadConfig,
    /// Body diagram configuration.
    pub diagram: DiagramConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/incident-report/state.db`
    pub database_path: Option<PathBuf>,
    /// Key the serialized report document is stored under.
    pub key: String,
}

/// Upload widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum size of a single file in bytes.
    pub max_file_size_bytes: u64,
    /// MIME types the widget accepts.
    pub accepted_types: Vec<String>,
}

/// Body diagram configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Image URL stored next to the marker position.
    pub image_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Resolved at runtime
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            accepted_types: default_accepted_types(),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            image_url: DEFAULT_DIAGRAM_IMAGE_URL.to_string(),
        }
    }
}

/// Image MIME types accepted by the upload widget.
#[must_use]
pub fn default_accepted_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/bmp",
        "image/svg+xml",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("INCIDENT_REPORT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "storage key must not be empty".to_string(),
            });
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_file_size_bytes must be greater than 0".to_string(),
            });
        }

        if self.upload.accepted_types.is_empty() {
            return Err(Error::ConfigValidation {
                message: "accepted_types must list at least one MIME type".to_string(),
            });
        }

        for mime in &self.upload.accepted_types {
            if !mime.starts_with("image/") {
                return Err(Error::ConfigValidation {
                    message: format!("accepted type is not an image MIME type: {mime}"),
                });
            }
        }

        if self.diagram.image_url.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "diagram image_url must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert_eq!(storage.key, "reportingFormData");
    }

    #[test]
    fn test_default_upload_config() {
        let upload = UploadConfig::default();

        assert_eq!(upload.max_file_size_bytes, 10_485_760);
        assert_eq!(upload.accepted_types.len(), 6);
        assert!(upload.accepted_types.contains(&"image/svg+xml".to_string()));
    }

    #[test]
    fn test_default_diagram_config() {
        assert_eq!(DiagramConfig::default().image_url, "/human.jpg");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_key() {
        let mut config = Config::default();
        config.storage.key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("storage key"));
    }

    #[test]
    fn test_validate_zero_max_size() {
        let mut config = Config::default();
        config.upload.max_file_size_bytes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_file_size_bytes"));
    }

    #[test]
    fn test_validate_non_image_type() {
        let mut config = Config::default();
        config.upload.accepted_types = vec!["application/pdf".to_string()];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("application/pdf"));
    }

    #[test]
    fn test_validate_empty_accepted_types() {
        let mut config = Config::default();
        config.upload.accepted_types.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("state.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/state.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/state.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("incident-report"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nkey = \"draft\"\n\n[upload]\nmax_file_size_bytes = 2048\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.storage.key, "draft");
        assert_eq!(config.upload.max_file_size_bytes, 2048);
        assert_eq!(config.upload.accepted_types, default_accepted_types());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upload]\nmax_file_size_bytes = 0\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_upload_config_deserialize() {
        let json = r#"{"max_file_size_bytes": 5000}"#;
        let upload: UploadConfig = serde_json::from_str(json).unwrap();
        assert_eq!(upload.max_file_size_bytes, 5000);
        assert_eq!(upload.accepted_types.len(), 6);
    }
}
