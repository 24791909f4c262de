use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Renders a response into wire bytes.
///
/// Content-Length always reflects the body, and every response carries
/// `Connection: close` since each connection serves a single exchange.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut headers: Vec<(&str, &str)> = resp
        .headers
        .iter()
        .filter(|(k, _)| {
            !k.eq_ignore_ascii_case("Content-Length") && !k.eq_ignore_ascii_case("Connection")
        })
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    // HashMap order is random; sorting keeps repeated replies byte-identical.
    headers.sort_unstable();

    let mut head = format!(
        "{HTTP_VERSION} {} {}\r\n",
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    for (name, value) in headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        resp.body.len()
    ));

    let mut buf = Vec::with_capacity(head.len() + resp.body.len());
    buf.extend_from_slice(head.as_bytes());
    buf.extend_from_slice(&resp.body);
    buf
}

/// Holds a serialized response and tracks how much of it reached the peer.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn write_to_stream<S>(&mut self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        while let Some(rest) = self.buffer.get(self.written..).filter(|r| !r.is_empty()) {
            match stream.write(rest).await? {
                0 => anyhow::bail!("peer stopped accepting bytes after {}", self.written),
                n => self.written += n,
            }
        }

        stream.flush().await?;
        Ok(())
    }
}
