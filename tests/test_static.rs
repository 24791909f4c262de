//! Tests for the static file responder

use gatehouse::http::response::StatusCode;
use gatehouse::static_files::StaticFiles;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("static/css")).unwrap();
    fs::write(dir.path().join("static/index.html"), "<p>hi</p>").unwrap();
    fs::write(dir.path().join("static/css/site.css"), "body{}").unwrap();
    fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
    dir
}

fn files(root: &Path) -> StaticFiles {
    StaticFiles::new(root, 8192).unwrap()
}

#[tokio::test]
async fn test_serves_existing_file() {
    let dir = site();
    let response = files(dir.path()).serve("/static/index.html").await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"<p>hi</p>".to_vec());
    assert_eq!(response.header("Content-Type"), Some("text/html"));
}

#[tokio::test]
async fn test_serves_nested_file_with_mime_type() {
    let dir = site();
    let response = files(dir.path()).serve("/static/css/site.css").await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.header("Content-Type"), Some("text/css"));
}

#[tokio::test]
async fn test_query_string_is_ignored() {
    let dir = site();
    let response = files(dir.path()).serve("/static/index.html?v=3").await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"<p>hi</p>".to_vec());
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = site();
    let response = files(dir.path()).serve("/static/missing.html").await;

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body, b"<h1>404 Not Found</h1>".to_vec());
}

#[tokio::test]
async fn test_directory_is_not_found() {
    let dir = site();
    let response = files(dir.path()).serve("/static/css").await;

    assert_eq!(response.status, StatusCode::NotFound);
}

#[tokio::test]
async fn test_invalid_path_gets_diagnostic() {
    let dir = site();
    let response = files(dir.path()).serve("/static/in\0dex.html").await;

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body, b"<h1>404 Not Found: invalid path</h1>".to_vec());
}

#[tokio::test]
async fn test_large_file_is_truncated() {
    let dir = site();
    fs::write(dir.path().join("static/big.txt"), "abcdefghij").unwrap();

    let response = StaticFiles::new(dir.path(), 4)
        .unwrap()
        .serve("/static/big.txt")
        .await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"abcd".to_vec());
    assert_eq!(response.header("Content-Length"), Some("4"));
}

#[tokio::test]
async fn test_parent_dir_escape_is_forbidden() {
    let dir = site();
    let response = files(dir.path()).serve("/static/../secret.txt").await;

    assert_eq!(response.status, StatusCode::Forbidden);
    assert!(!response.body.windows(10).any(|w| w == b"top secret"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_is_forbidden() {
    let dir = site();
    let outside = tempfile::tempdir().unwrap();
    fs::write(outside.path().join("passwd"), "root:x:0:0").unwrap();
    std::os::unix::fs::symlink(outside.path().join("passwd"), dir.path().join("static/link")).unwrap();

    let response = files(dir.path()).serve("/static/link").await;

    assert_eq!(response.status, StatusCode::Forbidden);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_inside_root_is_served() {
    let dir = site();
    std::os::unix::fs::symlink(
        dir.path().join("static/index.html"),
        dir.path().join("static/alias.html"),
    )
    .unwrap();

    let response = files(dir.path()).serve("/static/alias.html").await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"<p>hi</p>".to_vec());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_is_forbidden() {
    use std::os::unix::fs::PermissionsExt;

    let dir = site();
    let path = dir.path().join("static/locked.html");
    fs::write(&path, "locked").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through file modes; nothing to check then.
    if fs::File::open(&path).is_ok() {
        return;
    }

    let response = files(dir.path()).serve("/static/locked.html").await;
    assert_eq!(response.status, StatusCode::Forbidden);
    assert_eq!(response.body, b"<h1>403 Forbidden</h1>".to_vec());
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let dir = site();
    let files = files(dir.path());

    let first = files.serve("/static/index.html").await;
    let second = files.serve("/static/index.html").await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
    assert_eq!(first.headers, second.headers);
}

#[test]
fn test_missing_root_is_an_error() {
    assert!(StaticFiles::new("/definitely/not/here", 8192).is_err());
}
