//! Storage, configuration and logging adapters for parley.

pub mod config_service;
pub mod json_dir_session_repository;
pub mod logging;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_dir_session_repository::JsonDirSessionRepository;
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::paths::ParleyPaths;
