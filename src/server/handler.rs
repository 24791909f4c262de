use crate::config::Config;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::proxy::upstream::ProxyHandler;
use crate::router::{route, Route};
use crate::static_files::StaticFiles;

/// Turns a parsed request into exactly one response.
pub struct Handler {
    static_files: StaticFiles,
    proxy: ProxyHandler,
}

impl Handler {
    pub fn new(static_files: StaticFiles, proxy: ProxyHandler) -> Self {
        Self {
            static_files,
            proxy,
        }
    }

    pub fn from_config(cfg: &Config) -> std::io::Result<Self> {
        let static_files = StaticFiles::new(&cfg.static_files.root, cfg.static_files.max_file_size)?;
        Ok(Self::new(static_files, ProxyHandler::from_config(cfg)))
    }

    pub async fn handle(&self, request: &Request) -> Response {
        match route(&request.path) {
            Route::Static => self.static_files.serve(&request.path).await,
            Route::Proxy { path } => self.proxy.forward_request(&request.with_path(path)).await,
            Route::NotFound => Response::not_found(),
        }
    }
}
