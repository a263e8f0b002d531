//! Parked conversation threads.

use super::message::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved, inactive snapshot of a whole conversation.
///
/// Threads are coarser than forks: a fork is an alternate continuation
/// after one pivot in the live list, a thread is an entire parked list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionThread {
    pub id: String,
    pub name: String,
    /// Timestamp when the thread was parked (ISO 8601 format).
    pub created_at: String,
    pub messages: Vec<Message>,
}

impl SessionThread {
    /// Parks `messages` under `name` with a fresh id.
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            messages,
        }
    }
}
