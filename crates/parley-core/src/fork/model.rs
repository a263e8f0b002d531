//! Fork table types.

use crate::session::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One alternate continuation stored behind a pivot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkList {
    pub id: String,
    pub messages: Vec<Message>,
}

impl ForkList {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            id: format!("fork_list_{}", Uuid::new_v4()),
            messages,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// All branches stored for one pivot message.
///
/// `lists[position]` is the live branch. Its stored copy is kept empty
/// because the session's message list holds the live tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageForkEntry {
    pub position: usize,
    pub lists: Vec<ForkList>,
    /// Timestamp when the entry was created (ISO 8601 format).
    pub created_at: String,
}

impl MessageForkEntry {
    /// A fresh entry holding a single empty branch at position 0.
    pub fn new() -> Self {
        Self {
            position: 0,
            lists: vec![ForkList::empty()],
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// `0 <= position < lists.len()`
    pub fn is_consistent(&self) -> bool {
        self.position < self.lists.len()
    }

    pub fn branch_count(&self) -> usize {
        self.lists.len()
    }
}

impl Default for MessageForkEntry {
    fn default() -> Self {
        Self::new()
    }
}
