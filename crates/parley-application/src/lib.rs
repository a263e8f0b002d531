//! Application layer for Parley.
//!
//! This crate provides the serialized update queue and the session use case
//! that coordinates the domain layer with a session repository.

pub mod queue;
pub mod session;
pub mod session_usecase;

pub use queue::{QueueSeed, UpdateQueue};
pub use session_usecase::SessionUseCase;
