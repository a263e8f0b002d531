//! Port to the model-calling layer.

use crate::error::Result;
use crate::session::Message;
use async_trait::async_trait;

/// Produces assistant content from conversation history.
///
/// Implemented outside this workspace by whatever talks to the model
/// provider. Streaming is not part of the port: the implementation returns
/// the complete reply.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generates the next assistant reply for `context`.
    async fn generate(&self, context: &[Message]) -> Result<String>;

    /// Summarizes `messages` so a conversation can continue in a new thread.
    async fn summarize(&self, messages: &[Message]) -> Result<String>;
}
