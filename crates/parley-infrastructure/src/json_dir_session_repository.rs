//! Directory-backed SessionRepository implementation.
//!
//! Each session is stored as a pretty-printed JSON document named after its
//! id. Writes go through [`AtomicJsonFile`], so a crash mid-save leaves the
//! previous version in place.

use crate::paths::ParleyPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use parley_core::error::{ParleyError, Result};
use parley_core::session::{Session, SessionRepository};
use std::path::{Path, PathBuf};
use tokio::fs;

/// JSON directory session repository.
///
/// Directory structure:
/// ```text
/// sessions_dir/
/// ├── session-id-1.json
/// └── session-id-2.json
/// ```
pub struct JsonDirSessionRepository {
    sessions_dir: PathBuf,
}

impl JsonDirSessionRepository {
    /// Creates a repository at the platform sessions directory.
    pub async fn default_location() -> Result<Self> {
        Self::new(ParleyPaths::sessions_dir()?).await
    }

    /// Creates a repository rooted at `sessions_dir`, creating it if needed.
    pub async fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir).await?;
        tracing::debug!(path = %sessions_dir.display(), "Opened session directory");
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn file_for(&self, session_id: &str) -> Result<AtomicJsonFile<Session>> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.contains("..")
        {
            return Err(ParleyError::internal(format!(
                "Invalid session id '{session_id}'"
            )));
        }
        Ok(AtomicJsonFile::new(
            self.sessions_dir.join(format!("{session_id}.json")),
        ))
    }
}

#[async_trait]
impl SessionRepository for JsonDirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        self.file_for(session_id)?.load().await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.file_for(&session.id)?.save(session).await?;
        tracing::debug!(session_id = %session.id, "Saved session");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.file_for(session_id)?.remove().await
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut entries = fs::read_dir(&self.sessions_dir).await?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match AtomicJsonFile::<Session>::new(path.clone()).load().await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session file");
                    // Continue loading other sessions
                }
            }
        }

        // Sort by updated_at descending (most recent first)
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(sessions)
    }
}
