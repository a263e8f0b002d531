//! Session use case implementation.
//!
//! This module provides the `SessionUseCase` which every session write in
//! the application goes through: lifecycle, message edits, fork operations,
//! thread management and reply generation. All writes for one session are
//! funneled through that session's update queue.

use crate::session::{SessionQueueRegistry, SessionUpdater};
use parley_core::config::SessionDefaults;
use parley_core::error::{ParleyError, Result};
use parley_core::fork::{self, ForkDirection, ForkPatch};
use parley_core::generation::ReplyGenerator;
use parley_core::session::{Message, Session, SessionRepository};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Use case for managing sessions.
///
/// # Responsibilities
///
/// - Creating, reading, listing and deleting sessions
/// - Inserting, editing and removing messages
/// - Creating, switching, deleting and expanding forks
/// - Starting, switching and removing threads
/// - Running reply generation and writing its outcome back
///
/// # Thread Safety
///
/// The use case is shareable behind an `Arc`; concurrent calls for the same
/// session are serialized by its update queue, calls for different
/// sessions proceed independently.
pub struct SessionUseCase {
    /// Per-session update queues
    registry: Arc<SessionQueueRegistry>,
    /// Queue-backed find → update → save helper
    updater: SessionUpdater,
    /// Defaults for new sessions and threads
    defaults: SessionDefaults,
}

impl SessionUseCase {
    /// Creates a new `SessionUseCase` writing through `repository`.
    pub fn new(repository: Arc<dyn SessionRepository>, defaults: SessionDefaults) -> Self {
        let registry = Arc::new(SessionQueueRegistry::new(repository));
        Self {
            updater: SessionUpdater::new(Arc::clone(&registry)),
            registry,
            defaults,
        }
    }

    pub fn registry(&self) -> &Arc<SessionQueueRegistry> {
        &self.registry
    }

    // ============================================================================
    // Session lifecycle
    // ============================================================================

    /// Creates a session seeded with the default system prompt.
    pub async fn create_session(&self, name: Option<String>) -> Result<Arc<Session>> {
        let name = name.unwrap_or_else(|| self.defaults.default_session_name.clone());
        let session = Session::with_system_prompt(name, &self.defaults.default_system_prompt);
        tracing::info!(session_id = %session.id, "Creating session");
        self.updater.insert(session).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Arc<Session>> {
        self.updater
            .get(session_id)
            .await?
            .ok_or_else(|| ParleyError::not_found("Session", session_id))
    }

    /// Lists stored sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.registry.repository().list_all().await
    }

    /// Deletes a session.
    ///
    /// The delete is queued behind any pending writes for the session, so
    /// none of them can save it again afterwards. Deleting an unknown
    /// session is not an error.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.registry.queue_for(session_id).await.clear().await?;
        self.registry.remove(session_id).await;
        tracing::info!(session_id, "Deleted session");
        Ok(())
    }

    /// Applies `updater` to the session through its update queue.
    ///
    /// This is the escape hatch every other write is built on. `Ok(None)`
    /// from the updater leaves the session untouched and skips the write.
    pub async fn update_session_with_messages<F>(
        &self,
        session_id: &str,
        updater: F,
    ) -> Result<Arc<Session>>
    where
        F: FnOnce(&Session) -> Result<Option<Session>> + Send + 'static,
    {
        self.updater.update(session_id, updater).await
    }

    // ============================================================================
    // Messages
    // ============================================================================

    /// Appends a message to the live list.
    pub async fn insert_message(&self, session_id: &str, message: Message) -> Result<Arc<Session>> {
        self.updater
            .mutate(session_id, move |session| {
                session.insert_message(message);
                Ok(true)
            })
            .await
    }

    /// Inserts a message after `after_id`, or at the end of the live list.
    pub async fn insert_message_after(
        &self,
        session_id: &str,
        message: Message,
        after_id: &str,
    ) -> Result<Arc<Session>> {
        let after_id = after_id.to_string();
        self.updater
            .mutate(session_id, move |session| {
                session.insert_message_after(message, &after_id);
                Ok(true)
            })
            .await
    }

    /// Replaces the message with the same id.
    pub async fn modify_message(&self, session_id: &str, message: Message) -> Result<Arc<Session>> {
        self.updater
            .mutate(session_id, move |session| {
                session.modify_message(message)?;
                Ok(true)
            })
            .await
    }

    pub async fn remove_message(&self, session_id: &str, message_id: &str) -> Result<Arc<Session>> {
        let message_id = message_id.to_string();
        self.updater
            .mutate(session_id, move |session| {
                session.remove_message(&message_id)?;
                Ok(true)
            })
            .await
    }

    // ============================================================================
    // Forks
    // ============================================================================

    async fn apply_fork<F>(&self, session_id: &str, operation: F) -> Result<()>
    where
        F: FnOnce(&Session) -> Option<ForkPatch> + Send + 'static,
    {
        self.updater
            .update(session_id, move |current| {
                Ok(operation(current).map(|patch| {
                    let mut next = current.clone();
                    patch.apply(&mut next);
                    next
                }))
            })
            .await?;
        Ok(())
    }

    /// Backs up the messages after `pivot_id` into a new fork.
    pub async fn create_fork(&self, session_id: &str, pivot_id: &str) -> Result<()> {
        tracing::debug!(session_id, pivot_id, "create_fork");
        let pivot_id = pivot_id.to_string();
        self.apply_fork(session_id, move |s| fork::create_fork(s, &pivot_id))
            .await
    }

    pub async fn switch_fork(
        &self,
        session_id: &str,
        pivot_id: &str,
        direction: ForkDirection,
    ) -> Result<()> {
        tracing::debug!(session_id, pivot_id, ?direction, "switch_fork");
        let pivot_id = pivot_id.to_string();
        self.apply_fork(session_id, move |s| fork::switch_fork(s, &pivot_id, direction))
            .await
    }

    pub async fn delete_fork(&self, session_id: &str, pivot_id: &str) -> Result<()> {
        tracing::debug!(session_id, pivot_id, "delete_fork");
        let pivot_id = pivot_id.to_string();
        self.apply_fork(session_id, move |s| fork::delete_fork(s, &pivot_id))
            .await
    }

    pub async fn expand_fork(&self, session_id: &str, pivot_id: &str) -> Result<()> {
        tracing::debug!(session_id, pivot_id, "expand_fork");
        let pivot_id = pivot_id.to_string();
        self.apply_fork(session_id, move |s| fork::expand_fork(s, &pivot_id))
            .await
    }

    // ============================================================================
    // Threads
    // ============================================================================

    /// Parks the live conversation and restarts from the system prompt.
    pub async fn start_new_thread(&self, session_id: &str) -> Result<Arc<Session>> {
        let defaults = self.defaults.clone();
        self.updater
            .mutate(session_id, move |session| {
                Ok(session.start_new_thread(
                    &defaults.default_system_prompt,
                    &defaults.default_thread_name,
                ))
            })
            .await
    }

    /// Makes a parked thread live, parking the current conversation.
    pub async fn switch_thread(&self, session_id: &str, thread_id: &str) -> Result<Arc<Session>> {
        let thread_id = thread_id.to_string();
        let default_name = self.defaults.default_thread_name.clone();
        self.updater
            .mutate(session_id, move |session| {
                Ok(session.switch_thread(&thread_id, &default_name))
            })
            .await
    }

    pub async fn remove_thread(&self, session_id: &str, thread_id: &str) -> Result<Arc<Session>> {
        let thread_id = thread_id.to_string();
        self.updater
            .mutate(session_id, move |session| Ok(session.remove_thread(&thread_id)))
            .await
    }

    pub async fn rename_thread(
        &self,
        session_id: &str,
        thread_id: &str,
        name: &str,
    ) -> Result<Arc<Session>> {
        let thread_id = thread_id.to_string();
        let name = name.to_string();
        self.updater
            .mutate(session_id, move |session| {
                Ok(session.rename_thread(&thread_id, &name))
            })
            .await
    }

    /// Summarizes the live conversation and continues in a new thread
    /// seeded with the summary.
    ///
    /// Nothing is written if summarizing fails.
    pub async fn compress_into_new_thread(
        &self,
        session_id: &str,
        generator: &dyn ReplyGenerator,
    ) -> Result<Arc<Session>> {
        let session = self.get_session(session_id).await?;
        if !session.has_conversation() {
            return Ok(session);
        }
        let summary = generator.summarize(&session.messages).await?;
        let defaults = self.defaults.clone();
        self.updater
            .mutate(session_id, move |session| {
                Ok(session.compress_into_new_thread(
                    summary,
                    &defaults.default_system_prompt,
                    &defaults.default_thread_name,
                ))
            })
            .await
    }

    // ============================================================================
    // Generation
    // ============================================================================

    /// Generates a new reply right after `pivot_id`.
    ///
    /// An empty assistant message marked `generating` is inserted first and
    /// then filled in with the generated content, the generation error, or a
    /// cancelled marker if `cancel` fires first.
    pub async fn generate_after(
        &self,
        session_id: &str,
        pivot_id: &str,
        generator: &dyn ReplyGenerator,
        cancel: CancellationToken,
    ) -> Result<Arc<Session>> {
        let placeholder = Message::placeholder_reply();
        let reply_id = placeholder.id.clone();
        let pivot = pivot_id.to_string();
        let session = self
            .updater
            .mutate(session_id, move |session| {
                if session.locate(&pivot).is_none() {
                    return Err(ParleyError::not_found("Message", &pivot));
                }
                session.insert_message_after(placeholder, &pivot);
                Ok(true)
            })
            .await?;

        let context = session
            .locate(pivot_id)
            .and_then(|(list, index)| session.list(&list).map(|m| m[..=index].to_vec()))
            .unwrap_or_default();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = generator.generate(&context) => Some(result),
        };
        match &outcome {
            None => tracing::info!(session_id, reply_id = %reply_id, "Generation cancelled"),
            Some(Err(err)) => {
                tracing::warn!(session_id, reply_id = %reply_id, error = %err, "Generation failed")
            }
            Some(Ok(_)) => tracing::debug!(session_id, reply_id = %reply_id, "Generation finished"),
        }

        self.updater
            .mutate(session_id, move |session| {
                // The placeholder may have been removed while generating.
                let Some(mut reply) = session.find_message(&reply_id).cloned() else {
                    return Ok(false);
                };
                reply.generating = false;
                match outcome {
                    Some(Ok(content)) => reply.content = content,
                    Some(Err(err)) => reply.error = Some(err.to_string()),
                    None => reply.cancelled = true,
                }
                session.modify_message(reply)?;
                Ok(true)
            })
            .await
    }

    /// Regenerates `message_id` in a new fork.
    ///
    /// The message before it becomes the pivot: everything after the pivot
    /// is backed up by `create_fork` and a fresh reply is generated in the
    /// new branch. A message with no predecessor is left as is.
    pub async fn regenerate_in_new_fork(
        &self,
        session_id: &str,
        message_id: &str,
        generator: &dyn ReplyGenerator,
        cancel: CancellationToken,
    ) -> Result<Arc<Session>> {
        let session = self.get_session(session_id).await?;
        let index = session
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| ParleyError::not_found("Message", message_id))?;
        let Some(pivot_id) = index
            .checked_sub(1)
            .map(|i| session.messages[i].id.clone())
        else {
            tracing::debug!(session_id, message_id, "No message to fork from");
            return Ok(session);
        };

        self.create_fork(session_id, &pivot_id).await?;
        self.generate_after(session_id, &pivot_id, generator, cancel)
            .await
    }
}

#[cfg(test)]
#[path = "session_usecase_test.rs"]
mod tests;
