//! Configuration management for graphteams.
//!
//! Settings come from an optional TOML file, then the environment
//! (`CLIENT_ID`, `TENANT_ID`, ...) overrides whatever the file says.

pub mod paths;
pub mod settings;

pub use paths::config_file;
pub use settings::{ApiConfig, GraphTeamsConfig, IdentityConfig, TargetConfig};

use std::path::Path;

use crate::error::{GraphTeamsError, Result};

/// Load configuration from the default config file, or from `path` when given.
///
/// If the config file doesn't exist, returns default configuration.
pub fn load_config(path: Option<&Path>) -> Result<GraphTeamsConfig> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config_from(&config_file()?),
    }
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<GraphTeamsConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(GraphTeamsConfig::default().with_env_overrides());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: GraphTeamsConfig =
        toml::from_str(&contents).map_err(|e| GraphTeamsError::ConfigRead(e.to_string()))?;

    Ok(config.with_env_overrides())
}
