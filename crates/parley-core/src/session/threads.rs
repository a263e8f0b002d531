//! Thread transforms on a session.
//!
//! Each transform mutates the session in place and reports whether
//! anything changed, so callers can skip persisting no-op updates.

use super::message::Message;
use super::model::Session;
use super::thread::SessionThread;

impl Session {
    fn live_thread_name(&self, fallback: &str) -> String {
        self.thread_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                if self.name.is_empty() {
                    fallback.to_string()
                } else {
                    self.name.clone()
                }
            })
    }

    /// Fresh copy of the live system prompt, or `default_prompt`.
    fn fresh_system_prompt(&self, default_prompt: &str) -> Message {
        let content = self
            .system_prompt()
            .map(|m| m.content.clone())
            .unwrap_or_else(|| default_prompt.to_string());
        Message::system(content)
    }

    /// Parks the live messages as a thread and restarts from the system prompt.
    ///
    /// Returns `false` when the live list holds nothing but system prompts.
    pub fn start_new_thread(&mut self, default_prompt: &str, default_thread_name: &str) -> bool {
        if !self.has_conversation() {
            return false;
        }
        let system_prompt = self.fresh_system_prompt(default_prompt);
        let parked = SessionThread::new(
            self.live_thread_name(default_thread_name),
            std::mem::take(&mut self.messages),
        );
        self.threads.push(parked);
        self.messages = vec![system_prompt];
        self.thread_name = None;
        true
    }

    /// Moves thread `thread_id` into the live slot.
    ///
    /// The previous live messages are parked unless they hold nothing but
    /// system prompts. Returns `false` for an unknown thread.
    pub fn switch_thread(&mut self, thread_id: &str, default_thread_name: &str) -> bool {
        let Some(index) = self.threads.iter().position(|t| t.id == thread_id) else {
            return false;
        };
        let target = self.threads.remove(index);
        if self.has_conversation() {
            let parked = SessionThread::new(
                self.live_thread_name(default_thread_name),
                std::mem::take(&mut self.messages),
            );
            self.threads.push(parked);
        }
        self.messages = target.messages;
        self.thread_name = Some(target.name);
        true
    }

    pub fn remove_thread(&mut self, thread_id: &str) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| t.id != thread_id);
        self.threads.len() != before
    }

    pub fn rename_thread(&mut self, thread_id: &str, name: &str) -> bool {
        match self.threads.iter_mut().find(|t| t.id == thread_id) {
            Some(thread) if thread.name != name => {
                thread.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    /// Starts a new thread that carries `summary` forward.
    ///
    /// The live list becomes the system prompt followed by one assistant
    /// message holding the summary.
    pub fn compress_into_new_thread(
        &mut self,
        summary: impl Into<String>,
        default_prompt: &str,
        default_thread_name: &str,
    ) -> bool {
        if !self.start_new_thread(default_prompt, default_thread_name) {
            return false;
        }
        self.messages.push(Message::assistant(summary));
        true
    }
}
