//! Session application services.
//!
//! This module contains the per-session queue registry and the updater
//! that funnels every session write through it.

mod registry;
mod updater;

pub use registry::SessionQueueRegistry;
pub use updater::SessionUpdater;
