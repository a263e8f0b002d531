use super::context::{CliContext, print_session};
use anyhow::Result;

pub async fn start(ctx: &CliContext, session_id: &str) -> Result<()> {
    let session = ctx.usecase.start_new_thread(session_id).await?;
    print_session(&session)
}

pub async fn switch(ctx: &CliContext, session_id: &str, thread_id: &str) -> Result<()> {
    let session = ctx.usecase.switch_thread(session_id, thread_id).await?;
    print_session(&session)
}

pub async fn remove(ctx: &CliContext, session_id: &str, thread_id: &str) -> Result<()> {
    let session = ctx.usecase.remove_thread(session_id, thread_id).await?;
    print_session(&session)
}
