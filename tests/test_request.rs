use gatehouse::http::request::{Method, Request, RequestBuilder};
use std::collections::HashMap;

fn request_with_headers(headers: HashMap<String, String>) -> Request {
    Request {
        method: Method::POST,
        path: "/api".to_string(),
        version: "HTTP/1.1".to_string(),
        headers,
        body: vec![],
        truncated: false,
    }
}

#[test]
fn test_request_header_lookup_ignores_case() {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    let req = request_with_headers(headers);

    assert_eq!(req.header("Content-Type"), Some("application/json"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let mut headers = HashMap::new();
    headers.insert("Content-Length".to_string(), "42".to_string());
    let req = request_with_headers(headers);

    assert_eq!(req.content_length(), 42);
    assert_eq!(req.declared_length(), Some(42));
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    assert_eq!(request_with_headers(HashMap::new()).content_length(), 0);

    let mut headers = HashMap::new();
    headers.insert("Content-Length".to_string(), "not-a-number".to_string());
    let req = request_with_headers(headers);

    assert_eq!(req.content_length(), 0);
    assert_eq!(req.declared_length(), None);
}

#[test]
fn test_request_body_length_counts_captured_bytes() {
    let req = RequestBuilder::new()
        .method(Method::PUT)
        .path("/api/items/1")
        .body(b"{\"a\":1}".to_vec())
        .build()
        .unwrap();

    assert_eq!(req.body_length(), 7);
}

#[test]
fn test_request_with_path_keeps_everything_else() {
    let req = RequestBuilder::new()
        .method(Method::DELETE)
        .path("/api/items/1")
        .header("X-Trace", "abc")
        .body(b"x".to_vec())
        .build()
        .unwrap();

    let forwarded = req.with_path("/items/1");

    assert_eq!(forwarded.path, "/items/1");
    assert_eq!(forwarded.method, Method::DELETE);
    assert_eq!(forwarded.body, b"x".to_vec());
    assert_eq!(forwarded.header("X-Trace"), Some("abc"));
    assert_eq!(req.path, "/api/items/1");
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());

    let req = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    assert_eq!(req.version, "HTTP/1.1");
    assert!(!req.truncated);
}

#[test]
fn test_method_tokens() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (token, expected) in methods {
        let method = Method::from_token(token);
        assert_eq!(method, expected);
        assert_eq!(method.to_string(), token);
    }

    assert_eq!(Method::from_token("get"), Method::Other("get".to_string()));
}
