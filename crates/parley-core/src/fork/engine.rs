//! Fork engine.
//!
//! Pure functions computing [`ForkPatch`]es for the four branch operations.
//! None of them mutate their input. Each returns `None` when there is
//! nothing to do (unknown pivot, nothing to back up, no fork entry, a single
//! branch, or an entry whose position is out of range) so callers can skip
//! the update entirely instead of persisting an unchanged session.
//!
//! The pivot is searched in the live list first and then in every parked
//! thread; the first list containing it is the one operated on.

use super::model::{ForkList, MessageForkEntry};
use crate::session::{ListRef, Message, Session};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction for [`switch_fork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkDirection {
    Next,
    Prev,
}

impl ForkDirection {
    /// Steps `position` around a ring of `count` branches.
    pub fn step(self, position: usize, count: usize) -> usize {
        match self {
            Self::Next => (position + 1) % count,
            Self::Prev => (position + count - 1) % count,
        }
    }
}

/// The result of a fork operation: a replacement for one message list and
/// the whole new fork table.
#[derive(Debug, Clone, PartialEq)]
pub struct ForkPatch {
    /// The list the pivot was found in.
    pub target: ListRef,
    pub messages: Vec<Message>,
    pub message_forks_hash: HashMap<String, MessageForkEntry>,
}

impl ForkPatch {
    /// Installs the patch. A thread that has since disappeared is skipped.
    pub fn apply(self, session: &mut Session) {
        if let Some(list) = session.list_mut(&self.target) {
            *list = self.messages;
        }
        session.message_forks_hash = self.message_forks_hash;
    }
}

struct Pivot<'a> {
    target: ListRef,
    messages: &'a [Message],
    index: usize,
}

impl<'a> Pivot<'a> {
    fn find(session: &'a Session, pivot_id: &str) -> Option<Self> {
        let (target, index) = session.locate(pivot_id)?;
        let messages = session.list(&target)?;
        Some(Self {
            target,
            messages,
            index,
        })
    }

    /// Messages up to and including the pivot.
    fn head(&self) -> Vec<Message> {
        self.messages[..=self.index].to_vec()
    }

    /// Messages strictly after the pivot.
    fn tail(&self) -> &'a [Message] {
        &self.messages[self.index + 1..]
    }
}

fn consistent_entry<'a>(session: &'a Session, pivot_id: &str) -> Option<&'a MessageForkEntry> {
    let entry = session.message_forks_hash.get(pivot_id)?;
    if !entry.is_consistent() {
        tracing::warn!(
            pivot_id,
            position = entry.position,
            branches = entry.lists.len(),
            "Ignoring fork entry with out-of-range position"
        );
        return None;
    }
    Some(entry)
}

/// Backs up the messages after `pivot_id` and opens a fresh, empty branch.
///
/// The trailing messages are stored in the branch at the entry's current
/// position, a new empty branch is appended and becomes the live one, and
/// the list is truncated to end at the pivot.
pub fn create_fork(session: &Session, pivot_id: &str) -> Option<ForkPatch> {
    let pivot = Pivot::find(session, pivot_id)?;
    let tail = pivot.tail();
    if tail.is_empty() {
        return None;
    }

    let mut forks = session.message_forks_hash.clone();
    let entry = forks.entry(pivot_id.to_string()).or_default();
    if !entry.is_consistent() {
        tracing::warn!(pivot_id, "Refusing to fork behind an inconsistent fork entry");
        return None;
    }
    let position = entry.position;
    entry.lists[position] = ForkList::new(tail.to_vec());
    entry.lists.push(ForkList::empty());
    entry.position = entry.lists.len() - 1;

    Some(ForkPatch {
        target: pivot.target.clone(),
        messages: pivot.head(),
        message_forks_hash: forks,
    })
}

/// Makes the next or previous branch live.
///
/// The current tail is stored in the branch being left, and the branch
/// being entered is spliced in after the pivot with its stored copy
/// emptied.
pub fn switch_fork(session: &Session, pivot_id: &str, direction: ForkDirection) -> Option<ForkPatch> {
    let entry = consistent_entry(session, pivot_id)?;
    if entry.branch_count() <= 1 {
        return None;
    }
    let pivot = Pivot::find(session, pivot_id)?;

    let mut entry = entry.clone();
    let old_position = entry.position;
    let new_position = direction.step(old_position, entry.lists.len());
    if old_position != new_position {
        entry.lists[old_position].messages = pivot.tail().to_vec();
    }
    let incoming = std::mem::take(&mut entry.lists[new_position].messages);
    entry.position = new_position;

    let mut messages = pivot.head();
    messages.extend(incoming);
    let mut forks = session.message_forks_hash.clone();
    forks.insert(pivot_id.to_string(), entry);

    Some(ForkPatch {
        target: pivot.target,
        messages,
        message_forks_hash: forks,
    })
}

/// Deletes the live branch.
///
/// The neighbouring branch (clamped to the last one) becomes live. When no
/// branch is left the entry is removed and the list ends at the pivot.
pub fn delete_fork(session: &Session, pivot_id: &str) -> Option<ForkPatch> {
    let entry = consistent_entry(session, pivot_id)?;
    let pivot = Pivot::find(session, pivot_id)?;

    let mut entry = entry.clone();
    entry.lists.remove(entry.position);

    let mut messages = pivot.head();
    let mut forks = session.message_forks_hash.clone();
    if entry.lists.is_empty() {
        forks.remove(pivot_id);
    } else {
        entry.position = entry.position.min(entry.lists.len() - 1);
        let position = entry.position;
        messages.extend(std::mem::take(&mut entry.lists[position].messages));
        forks.insert(pivot_id.to_string(), entry);
    }

    Some(ForkPatch {
        target: pivot.target,
        messages,
        message_forks_hash: forks,
    })
}

/// Flattens every stored branch, in list order, onto the live tail and
/// removes the fork entry. Branches cannot be recovered afterwards.
pub fn expand_fork(session: &Session, pivot_id: &str) -> Option<ForkPatch> {
    let entry = session.message_forks_hash.get(pivot_id)?;
    let pivot = Pivot::find(session, pivot_id)?;

    let mut messages = pivot.messages.to_vec();
    messages.extend(entry.lists.iter().flat_map(|list| list.messages.iter().cloned()));
    let mut forks = session.message_forks_hash.clone();
    forks.remove(pivot_id);

    Some(ForkPatch {
        target: pivot.target,
        messages,
        message_forks_hash: forks,
    })
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
