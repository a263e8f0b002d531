//! Root configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every section
//! and field has a default so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which repository backs the session queues.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Sessions live only as long as the process.
    Memory,
    /// One JSON file per session.
    #[default]
    JsonDir,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Overrides the platform sessions directory.
    #[serde(default)]
    pub sessions_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    /// System prompt used when a session has none of its own.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    #[serde(default = "default_session_name")]
    pub default_session_name: String,
    /// Name given to parked threads of unnamed sessions.
    #[serde(default = "default_thread_name")]
    pub default_thread_name: String,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_session_name() -> String {
    "Untitled".to_string()
}

fn default_thread_name() -> String {
    "Untitled thread".to_string()
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
            default_session_name: default_session_name(),
            default_thread_name: default_thread_name(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub log_to_file: bool,
    /// Overrides the platform logs directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            log_to_file: false,
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RootConfig = toml::from_str(
            r#"
            [storage]
            backend = "memory"

            [session]
            default_session_name = "Chat"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.session.default_session_name, "Chat");
        assert_eq!(
            config.session.default_system_prompt,
            "You are a helpful assistant."
        );
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config, RootConfig::default());
        assert_eq!(config.storage.backend, StorageBackend::JsonDir);
    }
}
