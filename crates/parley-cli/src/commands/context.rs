use anyhow::{Context, Result};
use parley_application::SessionUseCase;
use parley_core::config::{RootConfig, StorageBackend};
use parley_core::session::{Session, SessionRepository};
use parley_infrastructure::logging::init_tracing;
use parley_infrastructure::{ConfigService, InMemorySessionRepository, JsonDirSessionRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

/// Everything a command needs, built once per invocation.
pub struct CliContext {
    pub usecase: SessionUseCase,
    _log_guard: Option<WorkerGuard>,
}

impl CliContext {
    /// Loads the config, installs logging and opens the configured storage.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ConfigService::new(config_path)?
            .get_config()
            .context("Failed to load configuration")?;
        let log_guard = init_tracing(&config.logging)?;

        let repository = open_repository(&config).await?;
        tracing::debug!(backend = ?config.storage.backend, "Opened session storage");

        Ok(Self {
            usecase: SessionUseCase::new(repository, config.session),
            _log_guard: log_guard,
        })
    }
}

async fn open_repository(config: &RootConfig) -> Result<Arc<dyn SessionRepository>> {
    Ok(match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemorySessionRepository::new()),
        StorageBackend::JsonDir => {
            let repository = match &config.storage.sessions_dir {
                Some(dir) => JsonDirSessionRepository::new(dir).await,
                None => JsonDirSessionRepository::default_location().await,
            }
            .context("Failed to open sessions directory")?;
            Arc::new(repository)
        }
    })
}

/// Prints a session as pretty JSON.
pub fn print_session(session: &Session) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(session)?);
    Ok(())
}
