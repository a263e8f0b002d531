//! Session domain module.
//!
//! This module contains all session-related domain models and the
//! repository interface.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `ListRef`)
//! - `message`: Conversation message types (`MessageRole`, `Message`)
//! - `thread`: Parked conversation snapshots (`SessionThread`)
//! - `threads`: Thread transforms on `Session`
//! - `repository`: Repository trait for session persistence

mod message;
mod model;
mod repository;
mod thread;
mod threads;

// Re-export public API
pub use message::{Message, MessageRole};
pub use model::{ListRef, Session};
pub use repository::SessionRepository;
pub use thread::SessionThread;
