use super::context::{CliContext, print_session};
use anyhow::Result;

pub async fn create(ctx: &CliContext, name: Option<String>) -> Result<()> {
    let session = ctx.usecase.create_session(name).await?;
    print_session(&session)
}

pub async fn list(ctx: &CliContext) -> Result<()> {
    for session in ctx.usecase.list_sessions().await? {
        println!(
            "{}  {}  {} messages  {}",
            session.id,
            session.updated_at,
            session.messages.len(),
            session.name
        );
    }
    Ok(())
}

pub async fn show(ctx: &CliContext, session_id: &str) -> Result<()> {
    let session = ctx.usecase.get_session(session_id).await?;
    print_session(&session)
}

pub async fn delete(ctx: &CliContext, session_id: &str) -> Result<()> {
    ctx.usecase.delete_session(session_id).await?;
    println!("Deleted session {session_id}");
    Ok(())
}
