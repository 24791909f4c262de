use crate::http::request::{Method, Request};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first line could not be split into a method and a path.
    MalformedRequestLine,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one request out of the bytes captured from a connection.
///
/// Only the request line is mandatory. Header lines without a colon are
/// skipped. The body is whatever follows the first `\r\n\r\n`, cut down to
/// Content-Length when that is smaller. When Content-Length promises more
/// than the buffer holds, the captured bytes are kept and the request is
/// marked `truncated`. Nothing outside `buf` is read.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    let headers_end = find_headers_end(buf);
    let head = &buf[..headers_end.unwrap_or(buf.len())];
    let body_bytes = match headers_end {
        Some(end) => &buf[end + 4..],
        None => &[][..],
    };

    // Request line
    let line_end = head.iter().position(|&b| b == b'\n').unwrap_or(head.len());
    let request_line = std::str::from_utf8(&head[..line_end])
        .map_err(|_| ParseError::MalformedRequestLine)?
        .trim_end_matches('\r');

    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let path = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let version = parts.next().unwrap_or("HTTP/1.1");

    // Headers
    let mut headers = HashMap::new();
    let header_text = String::from_utf8_lossy(&head[line_end..]);

    for line in header_text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let mut request = Request {
        method: Method::from_token(method),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
        truncated: false,
    };

    // Body
    let body = match request.declared_length() {
        Some(declared) if declared <= body_bytes.len() => &body_bytes[..declared],
        Some(_) => {
            request.truncated = true;
            body_bytes
        }
        None => body_bytes,
    };
    request.body = body.to_vec();

    Ok(request)
}

/// Parses an `HTTP/1.x <code> <reason>` status line at the start of `buf`.
///
/// Returns the code and the reason text (empty if absent).
pub fn parse_status_line(buf: &[u8]) -> Option<(u16, String)> {
    let line_end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let line = std::str::from_utf8(&buf[..line_end]).ok()?.trim_end_matches('\r');

    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }

    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    let code = code.parse::<u16>().ok()?;
    let reason = parts.next().unwrap_or("").to_string();

    Some((code, reason))
}

/// True once `buf` holds a full head and, when the head declares a
/// Content-Length, that many body bytes.
///
/// A head without Content-Length counts as complete at the separator.
/// Used for both directions: client requests and backend replies.
pub fn message_complete(buf: &[u8]) -> bool {
    match find_headers_end(buf) {
        Some(end) => buf.len() >= end + 4 + declared_content_length(buf).unwrap_or(0),
        None => false,
    }
}

/// Content-Length declared in the head of `buf`, once the head is complete.
pub fn declared_content_length(buf: &[u8]) -> Option<usize> {
    let end = find_headers_end(buf)?;
    let head = String::from_utf8_lossy(&buf[..end]);

    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("Content-Length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    })
}

/// Offset of the `\r\n\r\n` separating the head from the body.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
