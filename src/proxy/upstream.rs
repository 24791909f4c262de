//! The `/api` exchange with a backend.
//!
//! Every proxied request opens its own connection to a backend, sends one
//! re-framed request with `Connection: close`, reads the reply and closes
//! the connection. Failures never escape as errors: each one is mapped to
//! a 500 or 502 response at the point it is detected.

use crate::config::{Config, StatusPolicy};
use crate::http::parser::{
    declared_content_length, find_headers_end, message_complete, parse_status_line,
};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::proxy::backend::{Backend, BackendPool};
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Initial capacity of the reply buffer
const BUFFER_SIZE: usize = 8192;

/// Why an exchange with a backend failed.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no backend available")]
    NoBackend,
    #[error("invalid backend url {0}")]
    InvalidBackend(String),
    #[error("could not resolve {0} to an IPv4 address")]
    Resolve(String),
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("failed to send request to backend: {0}")]
    Send(io::Error),
    #[error("failed to read from backend: {0}")]
    Receive(io::Error),
    #[error("backend reply has no valid status line")]
    InvalidReply,
    #[error("outbound request of {size} bytes exceeds the {limit} byte limit")]
    RequestTooLarge { size: usize, limit: usize },
}

impl ProxyError {
    /// The response a client sees for this failure.
    pub fn to_response(&self) -> Response {
        match self {
            ProxyError::RequestTooLarge { .. } => Response::internal_error("proxy request too large"),
            ProxyError::NoBackend
            | ProxyError::InvalidBackend(_)
            | ProxyError::Resolve(_)
            | ProxyError::Connect { .. } => Response::bad_gateway("Backend Unavailable"),
            ProxyError::Send(_) => Response::bad_gateway("Failed to Send to Backend"),
            ProxyError::Receive(_) => Response::bad_gateway("Failed to Read from Backend"),
            ProxyError::InvalidReply => Response::bad_gateway("Invalid Response from Backend"),
        }
    }

    /// Whether the failure says something about the backend's health.
    fn is_backend_fault(&self) -> bool {
        !matches!(self, ProxyError::RequestTooLarge { .. })
    }
}

/// Answers `/api` requests by replaying them against the backend pool.
pub struct ProxyHandler {
    backend_pool: BackendPool,

    /// Bound on name resolution and on each connect attempt
    connection_timeout: Duration,

    /// Bound on the send, and on each read of the reply
    request_timeout: Duration,

    /// Cap on the framed outbound request
    max_request_size: usize,

    /// Cap on the bytes read back from a backend
    max_response_size: usize,

    status_policy: StatusPolicy,
}

impl ProxyHandler {
    /// Handler with the default request and reply caps and
    /// [`StatusPolicy::AlwaysOk`]; see the `with_*` setters.
    pub fn new(
        backend_pool: BackendPool,
        connection_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend_pool,
            connection_timeout,
            request_timeout,
            max_request_size: 8192,
            max_response_size: 64 * 1024,
            status_policy: StatusPolicy::AlwaysOk,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            BackendPool::new(cfg.proxy.backends.clone()),
            cfg.proxy.connect_timeout(),
            cfg.proxy.request_timeout(),
        )
        .with_max_request_size(cfg.server.max_request_size)
        .with_max_response_size(cfg.proxy.max_response_size)
        .with_status_policy(cfg.proxy.status_policy)
    }

    pub fn with_max_request_size(mut self, limit: usize) -> Self {
        self.max_request_size = limit;
        self
    }

    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn backend_pool(&self) -> &BackendPool {
        &self.backend_pool
    }

    /// Exchanges `request` with a backend and maps the outcome to a
    /// response.
    ///
    /// `request.path` must already be the path the backend should see.
    /// Backends are tried round-robin until one answers or every
    /// candidate has failed once. When every backend is down, the one that
    /// failed longest ago still gets a single attempt.
    pub async fn forward_request(&self, request: &Request) -> Response {
        let max_attempts = self.backend_pool.candidate_count().await;
        let mut last_error = ProxyError::NoBackend;

        for attempt in 0..max_attempts {
            let Some(backend) = self.backend_pool.next_backend().await else {
                break;
            };

            tracing::debug!(
                backend = backend.display_name(),
                attempt = attempt + 1,
                max_attempts,
                method = %request.method,
                path = %request.path,
                "Forwarding request to backend"
            );

            match self.proxy_to_backend(&backend, request).await {
                Ok(response) => {
                    self.backend_pool.record_success(&backend.url).await;

                    tracing::info!(
                        backend = backend.display_name(),
                        status = response.status.as_u16(),
                        method = %request.method,
                        path = %request.path,
                        "Request forwarded"
                    );
                    return response;
                }
                Err(e) if !e.is_backend_fault() => {
                    tracing::error!(error = %e, path = %request.path, "Cannot frame proxy request");
                    return e.to_response();
                }
                Err(e) => {
                    self.backend_pool.record_failure(&backend.url).await;

                    tracing::warn!(
                        backend = backend.display_name(),
                        error = %e,
                        method = %request.method,
                        path = %request.path,
                        attempt = attempt + 1,
                        "Backend exchange failed"
                    );
                    last_error = e;
                }
            }
        }

        tracing::error!(
            method = %request.method,
            path = %request.path,
            error = %last_error,
            "No backend produced a reply"
        );
        last_error.to_response()
    }

    /// One exchange with one backend. The stream is closed when it goes
    /// out of scope, whichever way this returns.
    async fn proxy_to_backend(&self, backend: &Backend, request: &Request) -> Result<Response, ProxyError> {
        let url = url::Url::parse(&backend.url)
            .map_err(|_| ProxyError::InvalidBackend(backend.url.clone()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidBackend(backend.url.clone()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        let request_bytes = self.build_http_request(request, &url)?;

        let mut stream = self.connect(host, port).await?;
        tracing::trace!(backend = backend.display_name(), "Connected to backend");

        timeout(self.request_timeout, stream.write_all(&request_bytes))
            .await
            .unwrap_or_else(|_| Err(timed_out("send")))
            .map_err(ProxyError::Send)?;

        let reply = self.read_reply(&mut stream).await.map_err(ProxyError::Receive)?;

        self.reply_to_response(&reply)
    }

    /// Resolves `host` to IPv4 addresses and connects to the first one
    /// that accepts.
    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, ProxyError> {
        let target = format!("{}:{}", host, port);

        let addrs: Vec<SocketAddr> = match timeout(
            self.connection_timeout,
            tokio::net::lookup_host((host, port)),
        )
        .await
        {
            Ok(Ok(addrs)) => addrs.filter(SocketAddr::is_ipv4).collect(),
            _ => return Err(ProxyError::Resolve(target)),
        };

        if addrs.is_empty() {
            return Err(ProxyError::Resolve(target));
        }

        let mut last_error = timed_out("connect");
        for addr in addrs {
            match timeout(self.connection_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = timed_out("connect"),
            }
        }

        Err(ProxyError::Connect {
            addr: target,
            source: last_error,
        })
    }

    /// Frames `request` for `backend_url` as a one-shot HTTP/1.1 request.
    ///
    /// Only `Host`, `Content-Length` and `Connection: close` are sent;
    /// inbound headers are not forwarded.
    pub fn build_http_request(&self, request: &Request, backend_url: &url::Url) -> Result<Vec<u8>, ProxyError> {
        let path = if request.path.is_empty() {
            "/"
        } else {
            &request.path
        };

        let host = match (backend_url.host_str(), backend_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ProxyError::InvalidBackend(backend_url.to_string())),
        };

        let head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            request.method,
            path,
            host,
            request.body_length()
        );

        let size = head.len() + request.body.len();
        if size > self.max_request_size {
            return Err(ProxyError::RequestTooLarge {
                size,
                limit: self.max_request_size,
            });
        }

        let mut buffer = Vec::with_capacity(size);
        buffer.extend_from_slice(head.as_bytes());
        buffer.extend_from_slice(&request.body);
        Ok(buffer)
    }

    /// Reads the backend reply until EOF, until a declared Content-Length
    /// is satisfied, or until `max_response_size` bytes are held.
    ///
    /// Each read is bounded by `request_timeout`. A backend that goes quiet
    /// after sending a complete head keeps what it sent; one that goes
    /// quiet before that is a receive failure.
    async fn read_reply(&self, stream: &mut TcpStream) -> io::Result<Vec<u8>> {
        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE.min(self.max_response_size));

        loop {
            let read = timeout(self.request_timeout, stream.read_buf(&mut buffer)).await;
            let n = match read {
                Ok(result) => result?,
                Err(_) if find_headers_end(&buffer).is_some() => {
                    tracing::debug!(
                        captured = buffer.len(),
                        "Backend went quiet after its reply, using what arrived"
                    );
                    break;
                }
                Err(_) => return Err(timed_out("receive")),
            };
            if n == 0 {
                break;
            }

            if buffer.len() >= self.max_response_size {
                tracing::warn!(
                    limit = self.max_response_size,
                    "Backend reply exceeds max_response_size, truncating"
                );
                buffer.truncate(self.max_response_size);
                break;
            }

            // Without a Content-Length the reply runs until the backend closes or goes quiet.
            if declared_content_length(&buffer).is_some() && message_complete(&buffer) {
                break;
            }
        }

        Ok(buffer.to_vec())
    }

    /// Maps raw backend bytes to a response. Backend headers are dropped;
    /// everything after the first blank line is the body.
    pub fn reply_to_response(&self, reply: &[u8]) -> Result<Response, ProxyError> {
        let body = match find_headers_end(reply) {
            Some(end) => &reply[end + 4..],
            None => reply,
        };

        let status = match self.status_policy {
            StatusPolicy::AlwaysOk => StatusCode::Ok,
            StatusPolicy::Propagate => {
                let (code, _reason) = parse_status_line(reply).ok_or(ProxyError::InvalidReply)?;
                StatusCode::from_u16(code)
            }
        };

        Ok(ResponseBuilder::new(status).body(body.to_vec()).build())
    }
}

fn timed_out(phase: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("backend {} timed out", phase))
}
