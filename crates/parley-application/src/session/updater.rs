//! Session updater helper for common update patterns.
//!
//! This module provides `SessionUpdater` which abstracts the
//! "find → update → touch → save" pattern on top of the session queues.

use super::registry::SessionQueueRegistry;
use parley_core::error::{ParleyError, Result};
use parley_core::session::Session;
use std::sync::Arc;

/// Helper struct for updating sessions through their update queue.
///
/// `SessionUpdater` encapsulates the pattern of:
/// 1. Taking the session as the queue currently holds it
/// 2. Computing a replacement (or deciding nothing changes)
/// 3. Updating the timestamp
/// 4. Letting the queue persist the batch
pub struct SessionUpdater {
    registry: Arc<SessionQueueRegistry>,
}

impl SessionUpdater {
    /// Creates a new `SessionUpdater` over the given registry.
    pub fn new(registry: Arc<SessionQueueRegistry>) -> Self {
        Self { registry }
    }

    /// Updates a session by applying the given updater function.
    ///
    /// The updater returns `Ok(None)` to leave the session untouched; the
    /// update then resolves with the current session without a write.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session doesn't exist
    /// - The updater function returns an error
    /// - Saving to storage fails
    pub async fn update<F>(&self, session_id: &str, updater: F) -> Result<Arc<Session>>
    where
        F: FnOnce(&Session) -> Result<Option<Session>> + Send + 'static,
    {
        tracing::debug!(session_id, "[SessionUpdater] update() queued");

        let queue = self.registry.queue_for(session_id).await;
        let id = session_id.to_string();
        queue
            .set(move |prev| {
                let current = prev.ok_or_else(|| ParleyError::not_found("Session", &id))?;
                match updater(current)? {
                    Some(mut next) => {
                        next.touch();
                        Ok(Arc::new(next))
                    }
                    None => Ok(Arc::clone(current)),
                }
            })
            .await
    }

    /// Applies `mutate` to a copy of the session.
    ///
    /// `mutate` reports whether it changed anything; `false` skips the write.
    pub async fn mutate<F>(&self, session_id: &str, mutate: F) -> Result<Arc<Session>>
    where
        F: FnOnce(&mut Session) -> Result<bool> + Send + 'static,
    {
        self.update(session_id, move |current| {
            let mut next = current.clone();
            Ok(mutate(&mut next)?.then_some(next))
        })
        .await
    }

    /// Stores a brand new session.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a session with the same id is present.
    pub async fn insert(&self, session: Session) -> Result<Arc<Session>> {
        let queue = self.registry.queue_for(&session.id).await;
        queue
            .set(move |prev| match prev {
                Some(existing) => Err(ParleyError::already_exists("Session", &existing.id)),
                None => Ok(Arc::new(session)),
            })
            .await
    }

    /// Reads the session as its queue currently holds it.
    pub async fn get(&self, session_id: &str) -> Result<Option<Arc<Session>>> {
        self.registry.queue_for(session_id).await.get().await
    }
}
