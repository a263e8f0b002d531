use super::context::{CliContext, print_session};
use anyhow::Result;
use clap::ValueEnum;
use parley_core::session::{Message, MessageRole};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    System,
    User,
    Assistant,
}

impl From<RoleArg> for MessageRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::System => MessageRole::System,
            RoleArg::User => MessageRole::User,
            RoleArg::Assistant => MessageRole::Assistant,
        }
    }
}

pub async fn add(
    ctx: &CliContext,
    session_id: &str,
    role: RoleArg,
    content: String,
    after: Option<String>,
) -> Result<()> {
    let message = Message::new(role.into(), content);
    let session = match after {
        Some(after_id) => {
            ctx.usecase
                .insert_message_after(session_id, message, &after_id)
                .await?
        }
        None => ctx.usecase.insert_message(session_id, message).await?,
    };
    print_session(&session)
}
