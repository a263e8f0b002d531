use super::context::{CliContext, print_session};
use anyhow::Result;
use parley_core::fork::ForkDirection;

#[derive(Clone, Copy, Debug)]
pub enum ForkCommand {
    Create,
    Next,
    Prev,
    Delete,
    Expand,
}

pub async fn run(
    ctx: &CliContext,
    command: ForkCommand,
    session_id: &str,
    pivot_id: &str,
) -> Result<()> {
    let usecase = &ctx.usecase;
    match command {
        ForkCommand::Create => usecase.create_fork(session_id, pivot_id).await?,
        ForkCommand::Next => {
            usecase
                .switch_fork(session_id, pivot_id, ForkDirection::Next)
                .await?
        }
        ForkCommand::Prev => {
            usecase
                .switch_fork(session_id, pivot_id, ForkDirection::Prev)
                .await?
        }
        ForkCommand::Delete => usecase.delete_fork(session_id, pivot_id).await?,
        ForkCommand::Expand => usecase.expand_fork(session_id, pivot_id).await?,
    }
    let session = usecase.get_session(session_id).await?;
    print_session(&session)
}
