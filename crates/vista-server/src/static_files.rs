//! Static file serving.
//!
//! Resolves request paths against the two served roots in fixed priority
//! order (primary first, then output). Path resolution rejects anything
//! that would escape a root; an escape attempt is answered with the same
//! not-found response as a missing file, never a server error.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::state::AppState;

/// Index file served for directory requests.
const INDEX_FILE: &str = "index.html";

/// Create router for static file serving over both roots.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_file)
}

/// Serve a file from the primary root, falling back to the output root.
async fn serve_file(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let Some(relative) = sanitize_request_path(uri.path()) else {
        return not_found();
    };

    for root in [&state.primary_root, &state.output_root] {
        if let Some(resolved) = resolve_in_root(root, &relative).await {
            return serve_resolved(&resolved).await;
        }
    }

    not_found()
}

/// Plain-text not-found response.
fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Convert a request path into a safe root-relative path.
///
/// Percent-decodes the raw URI path, then keeps only normal components:
/// `.` segments are skipped, while `..`, absolute and prefix components
/// reject the whole path. Returns `None` when the path cannot be used for
/// resolution (escape attempt or invalid encoding).
fn sanitize_request_path(raw: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let trimmed = decoded.trim_start_matches('/');

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

/// Resolve a sanitized relative path to a regular file under `root`.
///
/// Directories resolve to their index file if one is present.
async fn resolve_in_root(root: &Path, relative: &Path) -> Option<PathBuf> {
    let candidate = root.join(relative);
    let metadata = tokio::fs::metadata(&candidate).await.ok()?;

    if metadata.is_dir() {
        let index = candidate.join(INDEX_FILE);
        let index_metadata = tokio::fs::metadata(&index).await.ok()?;
        index_metadata.is_file().then_some(index)
    } else if metadata.is_file() {
        Some(candidate)
    } else {
        None
    }
}

/// Read a resolved file and build the response.
async fn serve_resolved(path: &Path) -> Response {
    // The file can disappear between resolution and read; answer 404 rather
    // than surfacing an internal error.
    match tokio::fs::read(path).await {
        Ok(content) => {
            let mime = mime_for(path);
            ([(header::CONTENT_TYPE, mime)], content).into_response()
        }
        Err(_) => not_found(),
    }
}

/// Return the MIME type string for the given file path.
fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
