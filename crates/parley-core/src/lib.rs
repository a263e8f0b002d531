//! Domain layer for Parley.
//!
//! Sessions, messages, threads and the fork engine. Everything here is
//! synchronous and free of I/O apart from the port traits.

pub mod config;
pub mod error;
pub mod fork;
pub mod generation;
pub mod session;

// Re-export common error type
pub use error::{ParleyError, Result};
