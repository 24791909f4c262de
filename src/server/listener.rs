use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tracing::{error, info, Instrument};

use crate::config::{Config, ServerConfig};
use crate::http::connection::{Connection, ConnectionLimits};
use crate::server::handler::Handler;

/// Pause after an accept error that is not tied to one connection, such as
/// running out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Failures setting up the listening socket. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
    #[error("failed to create socket: {0}")]
    Socket(io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("failed to listen on {addr}: {source}")]
    Listen { addr: SocketAddr, source: io::Error },
}

/// The listening socket plus the limits applied to each connection.
pub struct Server {
    listener: TcpListener,
    limits: ConnectionLimits,
    connections: Arc<Semaphore>,
}

impl Server {
    /// Creates, binds and listens. Must be called inside a tokio runtime.
    pub fn bind(cfg: &ServerConfig) -> Result<Self, ServerError> {
        let addr: SocketAddr = cfg
            .listen_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(cfg.listen_addr.clone()))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ServerError::Socket)?;
        socket.set_reuseaddr(true).map_err(ServerError::Socket)?;

        socket
            .bind(addr)
            .map_err(|source| ServerError::Bind { addr, source })?;
        let listener = socket
            .listen(cfg.backlog)
            .map_err(|source| ServerError::Listen { addr, source })?;

        Ok(Self {
            listener,
            limits: ConnectionLimits::from(cfg),
            connections: Arc::new(Semaphore::new(cfg.max_connections)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever. Each one runs on its own task while
    /// holding a permit, so at most `max_connections` are in flight.
    pub async fn run(self, handler: Arc<Handler>) -> anyhow::Result<()> {
        info!("Listening on {}", self.local_addr()?);

        loop {
            let permit = self.connections.clone().acquire_owned().await?;

            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    if let Some(pause) = accept_backoff(&e) {
                        tokio::time::sleep(pause).await;
                    }
                    continue;
                }
            };

            let handler = handler.clone();
            let limits = self.limits;
            let span = tracing::info_span!("conn", %peer);

            tokio::spawn(
                async move {
                    let mut conn = Connection::new(socket, handler, limits);
                    if let Err(e) = conn.run().await {
                        error!("Connection error: {}", e);
                    }
                    drop(permit);
                }
                .instrument(span),
            );
        }
    }
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let handler = Arc::new(Handler::from_config(cfg)?);
    let server = Server::bind(&cfg.server)?;
    server.run(handler).await
}

/// Errors about a single aborted handshake are retried at once. Anything
/// else, EMFILE included, would just fail again, so the loop waits.
fn accept_backoff(e: &io::Error) -> Option<Duration> {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}
