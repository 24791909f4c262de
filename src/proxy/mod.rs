//! Reverse proxy functionality
//!
//! Backend selection and the upstream exchange for `/api` requests.

pub mod backend;
pub mod upstream;

pub use backend::{Backend, BackendPool, BackendState, FAILURE_THRESHOLD};
pub use upstream::{ProxyError, ProxyHandler};
