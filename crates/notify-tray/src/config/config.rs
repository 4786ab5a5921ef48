//! Configuration management for notify-tray.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation at load time, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{IconConfig, LoggingConfig, default_menu},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use notify_tray_core::{Guid, IconId, MenuItemDescriptor, RegistryConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const CONFIG_FILE: &str = "config.toml";
const LOG_DIR: &str = "logs";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Message-loop settings passed to the tray registry.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// The demo icon.
    #[serde(default)]
    pub icon: IconConfig,
    /// Context menu shown on right click.
    #[serde(default = "default_menu")]
    pub menu: Vec<MenuItemDescriptor>,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            icon: IconConfig::default(),
            menu: default_menu(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the platform config directory, creating a
    /// default file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            Self::create_default(&config_path)
        }
    }

    /// Load and validate configuration from `path`, writing defaults there
    /// if the file is missing.
    #[track_caller]
    #[instrument]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Check the icon id range and GUID syntax.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        self.icon_id()?;
        self.icon_guid()?;
        Ok(())
    }

    /// The configured icon id.
    #[track_caller]
    pub fn icon_id(&self) -> AppResult<IconId> {
        IconId::new(self.icon.id).map_err(|e| AppError::ConfigError {
            reason: format!("icon.id: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// The configured icon GUID, if any.
    #[track_caller]
    pub fn icon_guid(&self) -> AppResult<Option<Guid>> {
        self.icon
            .guid
            .as_deref()
            .map(Guid::parse)
            .transpose()
            .map_err(|e| AppError::ConfigError {
                reason: format!("icon.guid: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "notify-tray", "Notify-Tray").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join(CONFIG_FILE))
    }

    #[track_caller]
    fn create_default(config_path: &Path) -> AppResult<Self> {
        let proj_dirs = Self::project_dirs()?;

        let config = Config {
            logging: LoggingConfig {
                directory: Some(proj_dirs.data_dir().join(LOG_DIR)),
                ..LoggingConfig::default()
            },
            ..Config::default()
        };

        config.save_to(config_path)?;

        info!(config_path = ?config_path, "Default config created");

        Ok(config)
    }
}
