use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::message::RoleArg;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI - branching chat sessions on disk", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, show and delete sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Add messages to a session
    Message {
        #[command(subcommand)]
        action: MessageAction,
    },
    /// Manage alternative branches after a message
    Fork {
        #[command(subcommand)]
        action: ForkAction,
    },
    /// Park and restore conversation threads
    Thread {
        #[command(subcommand)]
        action: ThreadAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a session seeded with the default system prompt
    New {
        #[arg(long)]
        name: Option<String>,
    },
    /// List sessions, most recently updated first
    List,
    Show { session_id: String },
    Delete { session_id: String },
}

#[derive(Subcommand)]
enum MessageAction {
    /// Append a message, or insert it after another one
    Add {
        session_id: String,
        content: String,
        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
        /// Insert after this message instead of appending
        #[arg(long)]
        after: Option<String>,
    },
}

#[derive(Subcommand)]
enum ForkAction {
    /// Back up everything after the pivot into a new branch
    Create { session_id: String, pivot_id: String },
    Next { session_id: String, pivot_id: String },
    Prev { session_id: String, pivot_id: String },
    /// Delete the live branch
    Delete { session_id: String, pivot_id: String },
    /// Flatten all branches into the conversation
    Expand { session_id: String, pivot_id: String },
}

#[derive(Subcommand)]
enum ThreadAction {
    /// Park the live conversation and start over
    New { session_id: String },
    Switch { session_id: String, thread_id: String },
    Remove { session_id: String, thread_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = commands::context::CliContext::load(cli.config).await?;

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::New { name } => commands::session::create(&ctx, name).await?,
            SessionAction::List => commands::session::list(&ctx).await?,
            SessionAction::Show { session_id } => commands::session::show(&ctx, &session_id).await?,
            SessionAction::Delete { session_id } => {
                commands::session::delete(&ctx, &session_id).await?
            }
        },
        Commands::Message { action } => match action {
            MessageAction::Add {
                session_id,
                content,
                role,
                after,
            } => commands::message::add(&ctx, &session_id, role, content, after).await?,
        },
        Commands::Fork { action } => {
            use commands::fork::ForkCommand;
            let (command, session_id, pivot_id) = match action {
                ForkAction::Create { session_id, pivot_id } => (ForkCommand::Create, session_id, pivot_id),
                ForkAction::Next { session_id, pivot_id } => (ForkCommand::Next, session_id, pivot_id),
                ForkAction::Prev { session_id, pivot_id } => (ForkCommand::Prev, session_id, pivot_id),
                ForkAction::Delete { session_id, pivot_id } => (ForkCommand::Delete, session_id, pivot_id),
                ForkAction::Expand { session_id, pivot_id } => (ForkCommand::Expand, session_id, pivot_id),
            };
            commands::fork::run(&ctx, command, &session_id, &pivot_id).await?
        }
        Commands::Thread { action } => match action {
            ThreadAction::New { session_id } => commands::thread::start(&ctx, &session_id).await?,
            ThreadAction::Switch {
                session_id,
                thread_id,
            } => commands::thread::switch(&ctx, &session_id, &thread_id).await?,
            ThreadAction::Remove {
                session_id,
                thread_id,
            } => commands::thread::remove(&ctx, &session_id, &thread_id).await?,
        },
    }

    Ok(())
}
