//! In-memory SessionRepository implementation.

use async_trait::async_trait;
use parley_core::error::Result;
use parley_core::session::{Session, SessionRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps sessions for the lifetime of the process.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_find_delete() {
        let repository = InMemorySessionRepository::new();
        let session = Session::new("Chat");

        repository.save(&session).await.unwrap();
        assert_eq!(
            repository.find_by_id(&session.id).await.unwrap(),
            Some(session.clone())
        );

        repository.delete(&session.id).await.unwrap();
        assert!(repository.find_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_most_recent_first() {
        let repository = InMemorySessionRepository::new();
        let mut older = Session::new("older");
        older.updated_at = "2024-01-01T00:00:00+00:00".to_string();
        let mut newer = Session::new("newer");
        newer.updated_at = "2024-06-01T00:00:00+00:00".to_string();

        repository.save(&older).await.unwrap();
        repository.save(&newer).await.unwrap();

        let names: Vec<String> = repository
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["newer", "older"]);
    }
}
