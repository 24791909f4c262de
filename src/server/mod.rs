//! Listening socket, accept loop and request dispatch.

pub mod handler;
pub mod listener;

pub use handler::Handler;
pub use listener::{Server, ServerError};
