//! Session domain model.
//!
//! This module contains the core Session entity: the live message list,
//! parked threads and the fork table keyed by pivot message id.

use super::message::Message;
use super::thread::SessionThread;
use crate::error::{ParleyError, Result};
use crate::fork::MessageForkEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Represents a chat session.
///
/// A session contains:
/// - The live message list (the active branch)
/// - Parked threads (whole-conversation snapshots)
/// - The fork table, mapping a pivot message id to its stored branches
/// - Timestamps for creation and last update
///
/// The serialized shape uses camelCase keys (`messageForksHash`, `threadName`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session name
    pub name: String,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
    /// Timestamp when the session was last updated (ISO 8601 format)
    pub updated_at: String,
    /// The live message list
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Parked threads, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<SessionThread>,
    /// Name of the live thread, if it was given one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    /// Fork entries keyed by pivot message id
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub message_forks_hash: HashMap<String, MessageForkEntry>,
}

/// Which message list of a session a message lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRef {
    /// The live message list.
    Live,
    /// The parked thread with this id.
    Thread(String),
}

impl Session {
    /// Creates an empty session with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
            threads: Vec::new(),
            thread_name: None,
            message_forks_hash: HashMap::new(),
        }
    }

    /// Creates a session whose live list starts with a system prompt.
    pub fn with_system_prompt(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let mut session = Self::new(name);
        session.messages.push(Message::system(prompt));
        session
    }

    /// Refreshes `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Finds the list holding `message_id` and the message's index in it.
    ///
    /// The live list is searched first, then threads in order.
    pub fn locate(&self, message_id: &str) -> Option<(ListRef, usize)> {
        if let Some(index) = self.messages.iter().position(|m| m.id == message_id) {
            return Some((ListRef::Live, index));
        }
        self.threads.iter().find_map(|thread| {
            thread
                .messages
                .iter()
                .position(|m| m.id == message_id)
                .map(|index| (ListRef::Thread(thread.id.clone()), index))
        })
    }

    pub fn list(&self, list: &ListRef) -> Option<&[Message]> {
        match list {
            ListRef::Live => Some(&self.messages),
            ListRef::Thread(id) => self
                .threads
                .iter()
                .find(|t| &t.id == id)
                .map(|t| t.messages.as_slice()),
        }
    }

    pub fn list_mut(&mut self, list: &ListRef) -> Option<&mut Vec<Message>> {
        match list {
            ListRef::Live => Some(&mut self.messages),
            ListRef::Thread(id) => self
                .threads
                .iter_mut()
                .find(|t| &t.id == id)
                .map(|t| &mut t.messages),
        }
    }

    /// Looks a message up in the live list and every thread.
    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        let (list, index) = self.locate(message_id)?;
        self.list(&list).and_then(|messages| messages.get(index))
    }

    /// Appends a message to the live list.
    pub fn insert_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Inserts `message` right after `after_id`.
    ///
    /// Falls back to appending to the live list when `after_id` is unknown.
    pub fn insert_message_after(&mut self, message: Message, after_id: &str) {
        if let Some((list, index)) = self.locate(after_id)
            && let Some(messages) = self.list_mut(&list)
        {
            messages.insert(index + 1, message);
            return;
        }
        self.messages.push(message);
    }

    /// Replaces the message with the same id, wherever it lives.
    pub fn modify_message(&mut self, message: Message) -> Result<()> {
        let (list, index) = self
            .locate(&message.id)
            .ok_or_else(|| ParleyError::not_found("Message", &message.id))?;
        if let Some(messages) = self.list_mut(&list) {
            messages[index] = message;
        }
        Ok(())
    }

    /// Removes a message and any fork entry pivoted on it.
    pub fn remove_message(&mut self, message_id: &str) -> Result<Message> {
        let (list, index) = self
            .locate(message_id)
            .ok_or_else(|| ParleyError::not_found("Message", message_id))?;
        let messages = self
            .list_mut(&list)
            .ok_or_else(|| ParleyError::not_found("Message", message_id))?;
        let removed = messages.remove(index);
        self.message_forks_hash.remove(message_id);
        Ok(removed)
    }

    /// The first system prompt of the live list.
    pub fn system_prompt(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_system())
    }

    /// Whether the live list holds anything beyond system prompts.
    pub fn has_conversation(&self) -> bool {
        self.messages.iter().any(|m| !m.is_system())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_thread() -> Session {
        let mut session = Session::new("test");
        session.messages = vec![
            Message::system("sys").with_id("sys"),
            Message::user("hello").with_id("u1"),
        ];
        let mut thread = SessionThread::new(
            "old",
            vec![
                Message::user("earlier").with_id("t-u1"),
                Message::assistant("reply").with_id("t-a1"),
            ],
        );
        thread.id = "thread-1".to_string();
        session.threads.push(thread);
        session
    }

    #[test]
    fn test_locate_searches_live_then_threads() {
        let session = session_with_thread();
        assert_eq!(session.locate("u1"), Some((ListRef::Live, 1)));
        assert_eq!(
            session.locate("t-a1"),
            Some((ListRef::Thread("thread-1".to_string()), 1))
        );
        assert_eq!(session.locate("missing"), None);
    }

    #[test]
    fn test_insert_message_after_inside_thread() {
        let mut session = session_with_thread();
        session.insert_message_after(Message::user("between").with_id("x"), "t-u1");

        let ids: Vec<_> = session.threads[0].messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["t-u1", "x", "t-a1"]);
    }

    #[test]
    fn test_insert_message_after_unknown_appends_to_live() {
        let mut session = session_with_thread();
        session.insert_message_after(Message::user("tail").with_id("x"), "nope");
        assert_eq!(session.messages.last().map(|m| m.id.as_str()), Some("x"));
    }

    #[test]
    fn test_modify_message_replaces_by_id() {
        let mut session = session_with_thread();
        let mut edited = session.find_message("t-a1").cloned().unwrap();
        edited.content = "edited".to_string();
        session.modify_message(edited).unwrap();
        assert_eq!(session.find_message("t-a1").unwrap().content, "edited");
    }

    #[test]
    fn test_modify_unknown_message_is_not_found() {
        let mut session = session_with_thread();
        let err = session
            .modify_message(Message::user("x").with_id("ghost"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_message_drops_fork_entry() {
        let mut session = session_with_thread();
        session
            .message_forks_hash
            .insert("u1".to_string(), MessageForkEntry::new());

        let removed = session.remove_message("u1").unwrap();
        assert_eq!(removed.content, "hello");
        assert!(session.message_forks_hash.is_empty());
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let mut session = session_with_thread();
        session
            .message_forks_hash
            .insert("u1".to_string(), MessageForkEntry::new());
        session.thread_name = Some("live".to_string());

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("messageForksHash").is_some());
        assert!(json.get("threadName").is_some());
        assert!(json["threads"][0].get("createdAt").is_some());

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_serialized_document_shape() {
        let session = Session::with_system_prompt("plain", "sys");

        let json = serde_json::to_value(&session).unwrap();
        let mut keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["createdAt", "id", "messages", "name", "updatedAt"]);
    }
}
