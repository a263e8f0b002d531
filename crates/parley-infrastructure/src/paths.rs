//! Unified path management for parley configuration and data files.
//!
//! All locations are derived from the platform directories reported by the
//! `dirs` crate so that the CLI and the repositories agree on where things
//! live.

use parley_core::error::{ParleyError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "parley";

/// Unified path management for parley.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/parley/            # Config directory
/// └── config.toml              # Application configuration
///
/// ~/.local/share/parley/       # Data directory
/// ├── sessions/                # One <id>.json per session
/// └── logs/                    # Daily rolling log files
///     └── parley.log.YYYY-MM-DD
/// ```
pub struct ParleyPaths;

impl ParleyPaths {
    /// Returns the parley configuration directory (e.g. `~/.config/parley/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ParleyError::config("Cannot find config directory"))
    }

    /// Returns the parley data directory (e.g. `~/.local/share/parley/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ParleyError::config("Cannot find data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn sessions_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("sessions"))
    }

    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }
}
