use gatehouse::config::{BackendConfig, Config, ConfigError, StatusPolicy};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:8080");
    assert_eq!(cfg.server.backlog, 10);
    assert_eq!(cfg.server.max_request_size, 8192);
    assert_eq!(cfg.static_files.max_file_size, 8192);
    assert_eq!(
        cfg.proxy.backends,
        vec![BackendConfig {
            url: "http://localhost:8000".to_string(),
            name: Some("default".to_string()),
        }]
    );
    assert_eq!(cfg.proxy.status_policy, StatusPolicy::AlwaysOk);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str(
        r#"
server:
  listen_addr: "127.0.0.1:9000"
static_files:
  root: "/srv/www"
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.server.backlog, 10);
    assert_eq!(cfg.static_files.root.to_str(), Some("/srv/www"));
    assert_eq!(cfg.static_files.max_file_size, 8192);
    assert_eq!(cfg.proxy.backends.len(), 1);
}

#[test]
fn test_config_full_yaml() {
    let cfg = Config::from_yaml_str(
        r#"
server:
  listen_addr: "0.0.0.0:3000"
  backlog: 128
  max_connections: 1
  max_request_size: 16384
  read_timeout_ms: 250
  write_timeout_ms: 750
static_files:
  root: "public"
  max_file_size: 1048576
proxy:
  backends:
    - url: "http://10.0.0.1:8000"
      name: a
    - url: "http://10.0.0.2:8000"
  connect_timeout_ms: 100
  request_timeout_ms: 200
  max_response_size: 4096
  status_policy: propagate
"#,
    )
    .unwrap();

    assert_eq!(cfg.server.max_connections, 1);
    assert_eq!(cfg.server.read_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.server.write_timeout(), Duration::from_millis(750));
    assert_eq!(cfg.proxy.backends.len(), 2);
    assert_eq!(cfg.proxy.backends[1].name, None);
    assert_eq!(cfg.proxy.connect_timeout(), Duration::from_millis(100));
    assert_eq!(cfg.proxy.request_timeout(), Duration::from_millis(200));
    assert_eq!(cfg.proxy.status_policy, StatusPolicy::Propagate);
}

#[test]
fn test_config_rejects_zero_limits() {
    let err = Config::from_yaml_str("server:\n  max_request_size: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = Config::from_yaml_str("server:\n  max_connections: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_config_rejects_bad_backend_urls() {
    for url in ["not a url", "https://localhost:8443", "unix:/tmp/sock"] {
        let yaml = format!("proxy:\n  backends:\n    - url: \"{}\"\n", url);
        let err = Config::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "url {}", url);
    }
}

#[test]
fn test_config_rejects_unknown_policy() {
    let err = Config::from_yaml_str("proxy:\n  status_policy: sometimes\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_from_missing_file() {
    let err = Config::from_file(std::path::Path::new("/no/such/gatehouse.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

// Environment variables are process-wide, so everything touching them
// lives in this one test.
#[test]
fn test_config_load_from_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server:\n  listen_addr: \"127.0.0.1:7000\"\n  backlog: 32").unwrap();

    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("GATEHOUSE_CONFIG");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:8080");

    unsafe {
        std::env::set_var("GATEHOUSE_CONFIG", file.path());
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:7000");
    assert_eq!(cfg.server.backlog, 32);

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:5000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:5000");
    assert_eq!(cfg.server.backlog, 32);

    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("GATEHOUSE_CONFIG");
    }
}
