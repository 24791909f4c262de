//! Runtime configuration.
//!
//! Configuration is read from a YAML file named by `GATEHOUSE_CONFIG`.
//! Every field has a default, so an absent file (or a partial one) is
//! fine. The `LISTEN` environment variable overrides the listen address.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub proxy: ProxyConfig,
}

/// Listening socket and per-connection limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Accept backlog passed to `listen(2)`.
    pub backlog: u32,
    /// Connections served at once. 1 serves strictly one at a time.
    pub max_connections: usize,
    /// Upper bound on the bytes captured from a client per request.
    pub max_request_size: usize,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    /// Files are truncated to this many bytes.
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub backends: Vec<BackendConfig>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_response_size: usize,
    pub status_policy: StatusPolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// What status the proxy reports after a successful exchange.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Always answer 200, whatever the backend said.
    #[default]
    AlwaysOk,
    /// Relay the status code from the backend's status line.
    Propagate,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            backlog: 10,
            max_connections: 64,
            max_request_size: 8192,
            read_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_file_size: 8192,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendConfig {
                url: "http://localhost:8000".to_string(),
                name: Some("default".to_string()),
            }],
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
            max_response_size: 64 * 1024,
            status_policy: StatusPolicy::AlwaysOk,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl ProxyConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Loads configuration from `GATEHOUSE_CONFIG` (or defaults) and
    /// applies the `LISTEN` override.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os("GATEHOUSE_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("server.max_connections", self.server.max_connections),
            ("server.max_request_size", self.server.max_request_size),
            ("static_files.max_file_size", self.static_files.max_file_size),
            ("proxy.max_response_size", self.proxy.max_response_size),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
            }
        }

        for backend in &self.proxy.backends {
            let url = url::Url::parse(&backend.url).map_err(|e| {
                ConfigError::Invalid(format!("backend url {:?}: {}", backend.url, e))
            })?;
            if url.scheme() != "http" {
                return Err(ConfigError::Invalid(format!(
                    "backend url {:?}: only http is supported",
                    backend.url
                )));
            }
            if url.host_str().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "backend url {:?}: missing host",
                    backend.url
                )));
            }
        }

        Ok(())
    }
}
