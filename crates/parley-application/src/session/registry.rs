//! Registry of per-session update queues.

use crate::queue::{QueueSeed, UpdateQueue, change_hook, loader};
use parley_core::session::{Session, SessionRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lazily created [`UpdateQueue`]s keyed by session id.
///
/// Every write to a session must go through the queue returned by
/// [`queue_for`](Self::queue_for); two queues for the same id would break
/// the serialization guarantee. Queues load their session from the
/// repository on first use, save through it on every committed batch and
/// delete from it when the queue is cleared.
pub struct SessionQueueRegistry {
    /// In-memory queue cache
    queues: Arc<RwLock<HashMap<String, Arc<UpdateQueue<Session>>>>>,
    /// Persistent storage backend for session data
    repository: Arc<dyn SessionRepository>,
}

impl SessionQueueRegistry {
    /// Creates an empty registry writing through `repository`.
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            repository,
        }
    }

    pub fn repository(&self) -> &Arc<dyn SessionRepository> {
        &self.repository
    }

    /// Returns the queue for `session_id`, creating it on first use.
    pub async fn queue_for(&self, session_id: &str) -> Arc<UpdateQueue<Session>> {
        {
            let queues = self.queues.read().await;
            if let Some(queue) = queues.get(session_id) {
                return Arc::clone(queue);
            }
        }

        let mut queues = self.queues.write().await;
        Arc::clone(
            queues
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(self.spawn_queue(session_id))),
        )
    }

    fn spawn_queue(&self, session_id: &str) -> UpdateQueue<Session> {
        tracing::debug!(session_id, "Creating session update queue");

        let repository = Arc::clone(&self.repository);
        let key = session_id.to_string();
        let load = loader(move || {
            let repository = Arc::clone(&repository);
            let key = key.clone();
            async move { repository.find_by_id(&key).await }
        });

        let repository = Arc::clone(&self.repository);
        let key = session_id.to_string();
        let save = change_hook(move |session: Option<Arc<Session>>| {
            let repository = Arc::clone(&repository);
            let key = key.clone();
            async move {
                match session {
                    Some(session) => repository.save(&session).await,
                    None => repository.delete(&key).await,
                }
            }
        });

        UpdateQueue::spawn(
            format!("session:{session_id}"),
            QueueSeed::Loader(load),
            Some(save),
        )
    }

    /// Drops the cached queue for `session_id`.
    ///
    /// Jobs already queued still run; later callers get a fresh queue that
    /// reloads from the repository.
    pub async fn remove(&self, session_id: &str) {
        let mut queues = self.queues.write().await;
        queues.remove(session_id);
    }

    /// Number of cached queues.
    pub async fn len(&self) -> usize {
        self.queues.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queues.read().await.is_empty()
    }
}
