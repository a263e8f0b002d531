//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the root configuration
//! from the configuration file (~/.config/parley/config.toml).

use crate::paths::ParleyPaths;
use parley_core::config::RootConfig;
use parley_core::error::{ParleyError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the root configuration.
///
/// The file is read on first access and cached until
/// [`ConfigService::invalidate_cache`] is called. A missing file is created
/// with the default configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading `path`, or the platform config file.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => ParleyPaths::config_file()?,
        };
        Ok(Self {
            path,
            config: Arc::new(RwLock::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| ParleyError::internal("config cache lock poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut write_lock = self
            .config
            .write()
            .map_err(|_| ParleyError::internal("config cache lock poisoned"))?;
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        match self.config.write() {
            Ok(mut write_lock) => *write_lock = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn load_config(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            let default_config = RootConfig::default();
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, toml::to_string_pretty(&default_config)?)?;
            tracing::info!(path = %self.path.display(), "Created default config file");
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.path)?;
        let config: RootConfig = toml::from_str(&content)
            .map_err(|e| ParleyError::config(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), "Loaded config");
        Ok(config)
    }
}
