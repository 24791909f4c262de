//! First-segment request routing.
//!
//! | Path prefix   | Route                                  |
//! |---------------|----------------------------------------|
//! | `/static/...` | [`Route::Static`]                      |
//! | `/api/...`    | [`Route::Proxy`] with `/api` stripped  |
//! | anything else | [`Route::NotFound`]                    |

/// Which responder handles a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Static,
    /// Forward to a backend using `path` as the target.
    Proxy { path: String },
    NotFound,
}

const STATIC_SEGMENT: &str = "static";
const API_SEGMENT: &str = "api";

/// Picks a route from the first path segment. Does no I/O.
pub fn route(path: &str) -> Route {
    let Some(rest) = path.strip_prefix('/') else {
        return Route::NotFound;
    };

    let segment_end = rest.find(['/', '?']).unwrap_or(rest.len());
    match &rest[..segment_end] {
        STATIC_SEGMENT => Route::Static,
        API_SEGMENT => Route::Proxy {
            path: forwarded_path(&rest[segment_end..]),
        },
        _ => Route::NotFound,
    }
}

fn forwarded_path(remainder: &str) -> String {
    if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{}", remainder)
    }
}
