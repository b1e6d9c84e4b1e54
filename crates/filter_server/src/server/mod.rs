//! Server implementation module.
//!
//! * `core` - The `FilterServer` lifecycle: router, accept loop, shutdown
//! * `handlers` - HTTP handlers for the submit and list commands

pub mod core;
pub mod handlers;

pub use core::FilterServer;
pub use handlers::{AppState, NO_DATA_MESSAGE};
