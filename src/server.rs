//!
//! bindery HTTP surface
//! --------------------
//! Axum middleware dispatching each request, in order, to: a direct file
//! authorized by the available-file index, any javascript package URL, any
//! stylesheet package URL, and finally the next handler in the chain. Also
//! provides a small router and a server runner for standalone use.
//!
//! Failure semantics follow the engine's contract: stat and resolution
//! errors during the direct-file check are swallowed and fall through to
//! package matching, while a failure during package content resolution
//! surfaces as that error's HTTP status.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use crate::config::AssetKind;
use crate::error::AssetError;
use crate::manager::AssetManager;

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        error!(target: "bindery", "asset resolution failed: {}", self);
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.to_string()).into_response()
    }
}

const STREAM_CHUNK: usize = 64 * 1024;

/// Stream an open file as a response body in fixed-size chunks.
fn file_body(file: tokio::fs::File) -> Body {
    let stream = futures_util::stream::try_unfold(file, |mut file| async move {
        let mut chunk = vec![0u8; STREAM_CHUNK];
        let read = file.read(&mut chunk).await?;
        if read == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        chunk.truncate(read);
        Ok(Some((Bytes::from(chunk), file)))
    });
    Body::from_stream(stream)
}

/// The middleware entry point. One pass per request, no state kept across
/// requests.
pub async fn asset_middleware(
    State(manager): State<Arc<AssetManager>>,
    request: Request,
    next: Next,
) -> Response {
    let raw_path = request.uri().path();
    let public_url = match urlencoding::decode(raw_path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw_path.to_string(),
    };

    // Direct file from the available index. A failing stat or open is
    // treated as "does not exist" and falls through to package matching.
    if let Some(file_path) = manager.file_path_from_public_url(&public_url) {
        if let Ok(metadata) = tokio::fs::metadata(&file_path).await {
            if metadata.is_file() {
                match tokio::fs::File::open(&file_path).await {
                    Ok(file) => {
                        debug!(target: "bindery", "serving file {}", file_path.display());
                        return (StatusCode::OK, file_body(file)).into_response();
                    }
                    Err(e) => {
                        debug!(target: "bindery", "open failed for {}: {}", file_path.display(), e);
                    }
                }
            }
        }
    }

    // Package URLs, scripts first, then styles.
    for kind in [AssetKind::Script, AssetKind::Style] {
        for name in manager.package_names(kind) {
            let Some(urls) = manager.urls(kind, &name) else { continue };
            if !urls.iter().any(|url| url == &public_url) {
                continue;
            }
            match manager.content(kind, &name).await {
                Ok(Some(content)) => {
                    debug!(target: "bindery", "serving {} package '{}'", kind.section_name(), name);
                    return (StatusCode::OK, content.into_body()).into_response();
                }
                // The package vanished between the URL match and the content
                // lookup; treat like any other miss.
                Ok(None) => {}
                Err(error) => return error.into_response(),
            }
        }
    }

    next.run(request).await
}

/// Router with the asset middleware mounted over a trivial liveness route.
/// Unmatched requests fall through the middleware into the router, which
/// answers 404.
pub fn router(manager: Arc<AssetManager>) -> Router {
    Router::new()
        .route("/", get(|| async { "bindery ok" }))
        .layer(middleware::from_fn_with_state(manager, asset_middleware))
}

/// Serve the asset router on the given port until the task is stopped.
pub async fn run_with_port(manager: Arc<AssetManager>, http_port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let app = router(manager);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "bindery", "HTTP listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
