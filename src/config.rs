use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine::LaunchOptions;
use crate::options::{NavigationOptions, ScreenshotOptions};
use crate::Viewport;

const CONFIG_DIR_NAME: &str = "pagerender";
const CONFIG_FILE_NAME: &str = "config.toml";

/// File-level defaults. Every section is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub launch: LaunchOptions,
    pub page: NavigationOptions,
    pub viewport: Viewport,
    pub screenshot: ScreenshotOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            launch: LaunchOptions::default(),
            page: NavigationOptions::default(),
            viewport: Viewport::default(),
            screenshot: ScreenshotOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Read(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

impl Config {
    /// Loads the explicit path if given, else the central config file if it
    /// exists, else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path().filter(|p| p.is_file()) {
                Some(central) => Self::from_file(&central),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// `<config dir>/pagerender/config.toml`, e.g. `~/.config/pagerender/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be positive, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if !(self.viewport.device_scale_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport deviceScaleFactor must be > 0, got {}",
                self.viewport.device_scale_factor
            )));
        }
        if let Some(quality) = self.screenshot.quality {
            if quality > 100 {
                return Err(ConfigError::Invalid(format!(
                    "screenshot quality must be within 0-100, got {}",
                    quality
                )));
            }
        }
        if self.launch.request_timeout == Duration::ZERO {
            return Err(ConfigError::Invalid(
                "launch request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
