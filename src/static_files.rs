//! Static file responder.
//!
//! A request path is resolved against the configured root as-is, so
//! `/static/index.html` maps to `<root>/static/index.html`. Paths that
//! climb out of the root, through `..` or a symlink, are refused with 403.
//!
//! At most `max_file_size` bytes of a file are returned. Longer files are
//! cut at that boundary and a warning is logged.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::http::mime::mime_for_path;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    max_file_size: usize,
}

/// Why a request path could not be turned into a file to read.
#[derive(Debug)]
enum Resolve {
    Invalid,
    Escapes,
    Io(io::Error),
}

impl StaticFiles {
    /// Creates a responder rooted at the canonical form of `root`.
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> io::Result<Self> {
        Ok(Self {
            root: std::fs::canonicalize(root)?,
            max_file_size,
        })
    }

    pub async fn serve(&self, request_path: &str) -> Response {
        let path = match self.resolve(request_path).await {
            Ok(path) => path,
            Err(Resolve::Invalid) => {
                warn!(path = %request_path, "Could not compose file path");
                return Response::error_page(StatusCode::NotFound, "404 Not Found: invalid path");
            }
            Err(Resolve::Escapes) => {
                warn!(path = %request_path, "Refusing path outside static root");
                return Response::forbidden();
            }
            Err(Resolve::Io(e)) => return io_error_response(request_path, &e),
        };

        match self.read_file(&path).await {
            Ok(body) => ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", mime_for_path(&path))
                .body(body)
                .build(),
            Err(e) => io_error_response(request_path, &e),
        }
    }

    async fn resolve(&self, request_path: &str) -> Result<PathBuf, Resolve> {
        let target = request_path.split('?').next().unwrap_or_default();
        let relative = target.trim_start_matches('/');

        if relative.contains('\0') {
            return Err(Resolve::Invalid);
        }

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => return Err(Resolve::Escapes),
                Component::RootDir | Component::Prefix(_) => return Err(Resolve::Invalid),
            }
        }

        let joined = self.root.join(relative);
        let canonical = tokio::fs::canonicalize(&joined).await.map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidInput {
                Resolve::Invalid
            } else {
                Resolve::Io(e)
            }
        })?;

        if !canonical.starts_with(&self.root) {
            return Err(Resolve::Escapes);
        }

        debug!(path = %canonical.display(), "Resolved static file");
        Ok(canonical)
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let file = File::open(path).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "path is a directory"));
        }

        let limit = self.max_file_size as u64;
        if metadata.len() > limit {
            warn!(
                path = %path.display(),
                size = metadata.len(),
                limit,
                "File larger than max_file_size, truncating"
            );
        }

        let mut body = Vec::with_capacity(metadata.len().min(limit) as usize);
        file.take(limit).read_to_end(&mut body).await?;
        Ok(body)
    }
}

fn io_error_response(request_path: &str, e: &io::Error) -> Response {
    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            debug!(path = %request_path, "Static file not readable");
            Response::forbidden()
        }
        _ => {
            debug!(path = %request_path, error = %e, "Static file not found");
            Response::not_found()
        }
    }
}
