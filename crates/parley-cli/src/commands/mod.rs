pub mod context;
pub mod fork;
pub mod message;
pub mod session;
pub mod thread;
