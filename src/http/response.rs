use std::collections::HashMap;

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): file served or backend exchange completed
/// - `Forbidden` (403): file exists but may not be read
/// - `NotFound` (404): no route, no file, or an unparseable request
/// - `InternalServerError` (500): the proxy request could not be framed
/// - `BadGateway` (502): the backend could not be reached or read
///
/// `Other` only appears when backend statuses are propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Forbidden,
    NotFound,
    InternalServerError,
    BadGateway,
    Other(u16),
}

impl StatusCode {
    /// Maps a numeric code onto a variant.
    ///
    /// # Example
    ///
    /// ```
    /// # use gatehouse::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(404), StatusCode::NotFound);
    /// assert_eq!(StatusCode::from_u16(201), StatusCode::Other(201));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            500 => StatusCode::InternalServerError,
            502 => StatusCode::BadGateway,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
            StatusCode::Other(code) => *code,
        }
    }

    /// Reason phrase for the status line; "Unknown" outside the table.
    pub fn reason_phrase(&self) -> &'static str {
        match self.as_u16() {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            422 => "Unprocessable Entity",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

/// What a responder hands back to the connection for serialization.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Content-Length always comes from the body, replacing any value set
    /// through [`ResponseBuilder::header`].
    pub fn build(mut self) -> Response {
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// An HTML error page: `<h1>{message}</h1>`.
    pub fn error_page(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/html")
            .body(format!("<h1>{}</h1>", message).into_bytes())
            .build()
    }

    /// 403 Forbidden.
    pub fn forbidden() -> Self {
        Self::error_page(StatusCode::Forbidden, "403 Forbidden")
    }

    /// 404 Not Found.
    pub fn not_found() -> Self {
        Self::error_page(StatusCode::NotFound, "404 Not Found")
    }

    /// 500 Internal Server Error with a short diagnostic.
    pub fn internal_error(detail: &str) -> Self {
        Self::error_page(
            StatusCode::InternalServerError,
            &format!("500 Internal Server Error: {}", detail),
        )
    }

    /// 502 Bad Gateway with a short diagnostic.
    pub fn bad_gateway(detail: &str) -> Self {
        Self::error_page(
            StatusCode::BadGateway,
            &format!("502 Bad Gateway: {}", detail),
        )
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
