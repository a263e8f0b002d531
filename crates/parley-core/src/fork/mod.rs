//! Conversation forks.
//!
//! - `model`: the fork table types (`MessageForkEntry`, `ForkList`)
//! - `engine`: patch computation for create, switch, delete and expand

mod engine;
mod model;

pub use engine::{ForkDirection, ForkPatch, create_fork, delete_fork, expand_fork, switch_fork};
pub use model::{ForkList, MessageForkEntry};
