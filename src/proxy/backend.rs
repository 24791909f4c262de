//! Backends behind `/api`.
//!
//! The pool hands out backends round-robin, skipping any that have failed
//! [`FAILURE_THRESHOLD`] exchanges in a row. A down backend is offered
//! again once [`RETRY_AFTER`] has passed since its last exchange, or
//! straight away when nothing else is up. One good exchange puts it back
//! into rotation.

use crate::config::BackendConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Consecutive failures after which a backend is taken out of rotation.
pub const FAILURE_THRESHOLD: u32 = 3;

/// How long a down backend sits out while others are up.
pub const RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct Backend {
    pub url: String,
    pub name: Option<String>,
    pub state: BackendState,
    /// When the last exchange with this backend finished, good or bad.
    pub last_seen: Option<Instant>,
    pub consecutive_failures: u32,
}

impl From<BackendConfig> for Backend {
    fn from(config: BackendConfig) -> Self {
        Self {
            url: config.url,
            name: config.name,
            state: BackendState::Up,
            last_seen: None,
            consecutive_failures: 0,
        }
    }
}

impl Backend {
    /// The configured name, falling back to the URL.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn is_available(&self) -> bool {
        self.state == BackendState::Up
    }

    /// A down backend whose last exchange is older than [`RETRY_AFTER`].
    pub fn is_due_for_retry(&self) -> bool {
        self.state == BackendState::Down
            && self.last_seen.is_none_or(|at| at.elapsed() >= RETRY_AFTER)
    }

    pub fn record_failure(&mut self) {
        self.last_seen = Some(Instant::now());
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.is_available() && self.consecutive_failures >= FAILURE_THRESHOLD {
            self.state = BackendState::Down;
            tracing::warn!(
                backend = self.display_name(),
                failures = self.consecutive_failures,
                "Taking backend out of rotation"
            );
        }
    }

    pub fn record_success(&mut self) {
        self.last_seen = Some(Instant::now());
        self.consecutive_failures = 0;

        if !self.is_available() {
            self.state = BackendState::Up;
            tracing::info!(backend = self.display_name(), "Backend back in rotation");
        }
    }
}

#[derive(Debug)]
struct Rotation {
    backends: Vec<Backend>,
    cursor: usize,
}

/// Shared, cloneable view of the configured backends.
#[derive(Debug, Clone)]
pub struct BackendPool {
    rotation: Arc<Mutex<Rotation>>,
}

impl BackendPool {
    pub fn new(configs: Vec<BackendConfig>) -> Self {
        Self {
            rotation: Arc::new(Mutex::new(Rotation {
                backends: configs.into_iter().map(Backend::from).collect(),
                cursor: 0,
            })),
        }
    }

    /// Picks the next backend that is up or due for a retry, advancing the
    /// cursor past it. With every backend down, the one that failed longest
    /// ago is returned so a recovered backend can be noticed.
    pub async fn next_backend(&self) -> Option<Backend> {
        let mut rotation = self.rotation.lock().await;
        let len = rotation.backends.len();

        let picked = (0..len)
            .map(|step| (rotation.cursor + step) % len)
            .find(|&i| {
                let backend = &rotation.backends[i];
                backend.is_available() || backend.is_due_for_retry()
            })
            .or_else(|| {
                rotation
                    .backends
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, b)| b.last_seen)
                    .map(|(i, _)| i)
            })?;

        rotation.cursor = (picked + 1) % len;
        Some(rotation.backends[picked].clone())
    }

    pub async fn record_failure(&self, url: &str) {
        self.update(url, Backend::record_failure).await;
    }

    pub async fn record_success(&self, url: &str) {
        self.update(url, Backend::record_success).await;
    }

    async fn update(&self, url: &str, f: impl FnOnce(&mut Backend)) {
        let mut rotation = self.rotation.lock().await;
        if let Some(backend) = rotation.backends.iter_mut().find(|b| b.url == url) {
            f(backend);
        }
    }

    /// Snapshot of every backend, up or down.
    pub async fn snapshot(&self) -> Vec<Backend> {
        self.rotation.lock().await.backends.clone()
    }

    /// How many distinct backends [`BackendPool::next_backend`] would
    /// offer right now. Never 0 unless the pool is empty.
    pub async fn candidate_count(&self) -> usize {
        let rotation = self.rotation.lock().await;
        let eligible = rotation
            .backends
            .iter()
            .filter(|b| b.is_available() || b.is_due_for_retry())
            .count();
        eligible.max(rotation.backends.len().min(1))
    }

    pub async fn available_count(&self) -> usize {
        let rotation = self.rotation.lock().await;
        rotation.backends.iter().filter(|b| b.is_available()).count()
    }
}
