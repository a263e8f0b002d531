//! File storage primitives shared by the repositories.

pub mod atomic_json;

pub use atomic_json::AtomicJsonFile;
