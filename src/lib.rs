//! Gatehouse - static files and a reverse proxy over HTTP/1.1
//!
//! Each connection carries one request: `/static/...` is answered from
//! disk, `/api/...` is forwarded to a backend, everything else is 404.

pub mod config;
pub mod http;
pub mod proxy;
pub mod router;
pub mod server;
pub mod static_files;
