//! Configuration system for the Strata display server
//!
//! Loads configuration from a TOML file at `~/.config/strata/config.toml`
//! and auto-generates a default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::window::flags::WindowLook;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    pub decorator: DecoratorConfig,
    pub ipc: IpcConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("strata");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string = toml::to_string_pretty(&default_config)
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Screen geometry the desktop arbiter clips against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Stock decorator metrics and default look
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoratorConfig {
    /// Tab/titlebar strip height in pixels
    pub titlebar_height: i32,
    /// Border ring width in pixels
    pub border_width: i32,
    /// Look applied when a client does not request one
    pub default_look: WindowLook,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            titlebar_height: 24,
            border_width: 4,
            default_look: WindowLook::Titled,
        }
    }
}

/// Client session transport settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Override for the session socket path (defaults to
    /// `$XDG_RUNTIME_DIR/strata.sock`)
    pub socket_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.screen.width, config.screen.width);
        assert_eq!(
            parsed.decorator.titlebar_height,
            config.decorator.titlebar_height
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[screen]\nwidth = 800\nheight = 600\n").unwrap();
        assert_eq!(parsed.screen.width, 800);
        assert_eq!(
            parsed.decorator.border_width,
            DecoratorConfig::default().border_width
        );
    }
}
