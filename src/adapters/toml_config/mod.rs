// TOML config adapter - Loads the typed configuration from TOML files

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::AppConfig;
use crate::domain::errors::ConfigError;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "dashpack.toml";

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse TOML config: {}", e)))
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::parse(&content)
    }

    /// Load the explicit file, else the default file if present, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Ok((Self::load(&default_path)?, Some(default_path)));
        }

        Ok((AppConfig::default(), None))
    }
}
