//! Client configuration stored in config.toml

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_connect_timeout() -> u64 {
    30
}

fn default_listing_grace() -> u64 {
    5
}

/// Client-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Seconds to wait for the share handshake before giving up
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seconds a listing stays reusable after its last consumer is gone
    #[serde(default = "default_listing_grace")]
    pub listing_grace_secs: u64,
    /// Override for the staging directory; system temp dir when unset
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            listing_grace_secs: 5,
            staging_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load from the default location, creating the file if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file().ok_or_else(|| ConfigError::ReadFile {
            path: PathBuf::from("config.toml"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config file path",
            ),
        })?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        ensure_config_dir().map_err(ConfigError::CreateDir)?;

        let path = config_file().ok_or_else(|| ConfigError::WriteFile {
            path: PathBuf::from("config.toml"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config file path",
            ),
        })?;

        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories as needed
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDir)?;
        }

        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn listing_grace(&self) -> Duration {
        Duration::from_secs(self.listing_grace_secs)
    }
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "skylight", "skylight")
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Get the path to the config file
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Ensure the config directory exists with proper permissions
pub fn ensure_config_dir() -> std::io::Result<PathBuf> {
    let dir = config_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        // Owner-only access on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    Ok(dir)
}

/// Get the log directory path
pub fn log_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("SKYLIGHT_LOG_DIR") {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        return Some(PathBuf::from(trimmed));
    }

    config_dir().map(|d| d.join("logs"))
}
