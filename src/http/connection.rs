use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::parser::{message_complete, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::handler::Handler;

const READ_CHUNK: usize = 1024;

/// Per-connection bounds on buffering and blocking.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_request_size: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl From<&ServerConfig> for ConnectionLimits {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            max_request_size: cfg.max_request_size,
            read_timeout: cfg.read_timeout(),
            write_timeout: cfg.write_timeout(),
        }
    }
}

/// One client connection, serving a single request then closing.
pub struct Connection<S> {
    stream: S,
    handler: Arc<Handler>,
    limits: ConnectionLimits,
    buffer: Vec<u8>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, handler: Arc<Handler>, limits: ConnectionLimits) -> Self {
        Self {
            stream,
            handler,
            limits,
            buffer: Vec::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => {
                    self.read_request().await?;

                    if self.buffer.is_empty() {
                        debug!("Connection closed before any request bytes");
                        ConnectionState::Closed
                    } else {
                        match parse_http_request(&self.buffer) {
                            Ok(request) => ConnectionState::Processing(request),
                            Err(e) => {
                                warn!(error = %e, "Rejecting unparseable request");
                                ConnectionState::Writing(ResponseWriter::new(&Response::not_found()))
                            }
                        }
                    }
                }

                ConnectionState::Processing(request) => {
                    if request.truncated {
                        warn!(
                            declared = request.content_length(),
                            captured = request.body_length(),
                            limit = self.limits.max_request_size,
                            "Request body truncated"
                        );
                    }

                    let response = self.handler.handle(&request).await;

                    info!(
                        method = %request.method,
                        path = %request.path,
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        "Request served"
                    );

                    ConnectionState::Writing(ResponseWriter::new(&response))
                }

                ConnectionState::Writing(mut writer) => {
                    let written =
                        timeout(self.limits.write_timeout, writer.write_to_stream(&mut self.stream)).await;
                    match written {
                        Ok(result) => result?,
                        Err(_) => {
                            return Err(anyhow::anyhow!(
                                "write timed out after {} of {} bytes",
                                writer.written(),
                                writer.len()
                            ));
                        }
                    }

                    // Best effort: the peer may already be gone.
                    let _ = self.stream.shutdown().await;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Fills the buffer until the request is complete, the peer stops
    /// sending, `max_request_size` is reached, or a read times out.
    ///
    /// A timeout is not an error: whatever was captured gets served.
    pub async fn read_request(&mut self) -> anyhow::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];

        while !message_complete(&self.buffer) {
            let room = self.limits.max_request_size.saturating_sub(self.buffer.len());
            if room == 0 {
                warn!(
                    limit = self.limits.max_request_size,
                    "Request reached max_request_size"
                );
                break;
            }

            let want = room.min(chunk.len());
            let read = timeout(self.limits.read_timeout, self.stream.read(&mut chunk[..want])).await;
            let n = match read {
                Ok(result) => result?,
                Err(_) => {
                    if !self.buffer.is_empty() {
                        warn!(captured = self.buffer.len(), "Read timed out mid-request");
                    }
                    break;
                }
            };

            if n == 0 {
                break;
            }

            self.buffer.extend_from_slice(&chunk[..n]);
        }

        Ok(())
    }
}
