//! Platform-specific path utilities for graphteams.

use std::path::PathBuf;

use crate::error::{GraphTeamsError, Result};

/// Get the configuration directory for graphteams.
///
/// - Linux: `~/.config/graphteams`
/// - macOS: `~/Library/Application Support/graphteams`
/// - Windows: `%APPDATA%\graphteams`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        GraphTeamsError::Config("Cannot determine config directory".to_string())
    })?;
    Ok(base.join("graphteams"))
}

/// Get the main configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
