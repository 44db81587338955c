//! Request dispatch.
//!
//! # Responsibilities
//! - Resolve the virtual host to a route
//! - Pick exactly one terminal action per request:
//!   serve static / serve rewritten legacy asset / forward / reject
//! - Run the action against the response sink
//!
//! # Decision procedure (first match wins)
//! ```text
//! 1. resolve Host        → unparsable: 500; unknown host: 404
//! 2. no static root      → forward (API-only route, no stat calls)
//! 3. legacy asset match  → canonical file exists: serve it
//!                          otherwise: 404 (the rule owns its pattern space)
//! 4. literal path        → file or directory: serve; missing: forward
//! 5. probe I/O error     → 500, never conflated with "not found"
//! ```

use axum::body::Body;
use axum::http::header::{self, HeaderMap};
use axum::http::uri::PathAndQuery;
use axum::http::{Request, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::fs::probe::{self, PathKind};
use crate::http::server::AppState;
use crate::http::sink::{ReplayRequest, ResponseSink};
use crate::routing::rewrite::PathClassifier;
use crate::routing::router::Route;

/// Paths that are expected browser/tooling noise; requests for them on
/// unknown hosts die quietly instead of being logged as misconfigurations.
const NOISE_PATHS: &[&str] = &["/favicon.ico", "/mini-profiler-resources/results"];

/// The terminal action chosen for a request on a matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Serve the request path from the route's static root.
    Static { fs_path: PathBuf },
    /// Serve a rewritten legacy asset path from the static root.
    StaticRewritten { path: String, fs_path: PathBuf },
    /// Forward to the route's upstream.
    Forward,
}

/// Why a request on a matched route could not be dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A legacy asset rewrite matched, but the canonical file is absent.
    /// The rule owns its pattern space: this is a 404, never a fallback to
    /// the literal path or the upstream.
    #[error("rewritten asset path {target:?} does not resolve to a file")]
    RewriteTargetMissing { target: String },

    /// The filesystem probe failed with a real I/O error.
    #[error("filesystem probe of {path:?} failed: {source}")]
    Probe { path: PathBuf, source: io::Error },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RewriteTargetMissing { .. } => StatusCode::NOT_FOUND,
            DispatchError::Probe { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handle one request end to end.
pub async fn handle(state: AppState, request: Request<Body>) -> Response<Body> {
    let path = request.uri().path().to_string();

    let route = match state.table.resolve(request.uri(), request.headers()) {
        Err(err) => {
            tracing::error!(path = %path, error = %err, "failed to resolve virtual host");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to determine virtual host",
            )
                .into_response();
        }
        Ok(None) => {
            let host = raw_host(request.headers());
            if NOISE_PATHS.contains(&path.as_str()) {
                tracing::debug!(host = %host, path = %path, "noise path on unknown host");
            } else {
                tracing::error!(host = %host, path = %path, "no route for host");
            }
            return (StatusCode::NOT_FOUND, "No route for host").into_response();
        }
        Ok(Some(route)) => route,
    };

    let Some(static_root) = &route.static_root else {
        tracing::debug!(
            route = %route.name,
            path = %path,
            upstream = %route.upstream,
            "forwarding (route has no static root)"
        );
        return forward_route(&state, route, request).await;
    };

    match decide(&state.classifier, static_root, &path).await {
        Ok(DispatchDecision::Static { fs_path }) => {
            tracing::debug!(
                route = %route.name,
                path = %path,
                file = %fs_path.display(),
                "serving static path"
            );
            serve_static(static_root, request, None).await
        }
        Ok(DispatchDecision::StaticRewritten { path: target, fs_path }) => {
            tracing::debug!(
                route = %route.name,
                path = %path,
                target = %target,
                file = %fs_path.display(),
                "serving rewritten legacy asset"
            );
            serve_static(static_root, request, Some(target)).await
        }
        Ok(DispatchDecision::Forward) => {
            tracing::debug!(
                route = %route.name,
                path = %path,
                upstream = %route.upstream,
                "forwarding to upstream"
            );
            forward_route(&state, route, request).await
        }
        Err(err) => {
            match &err {
                DispatchError::RewriteTargetMissing { target } => {
                    tracing::warn!(
                        route = %route.name,
                        path = %path,
                        target = %target,
                        "legacy asset rewrite missed"
                    );
                }
                DispatchError::Probe { path: fs_path, source } => {
                    tracing::error!(
                        route = %route.name,
                        path = %path,
                        file = %fs_path.display(),
                        error = %source,
                        "filesystem probe failed"
                    );
                }
            }
            err.status().into_response()
        }
    }
}

/// Pick the terminal action for a request path on a route with a static
/// root. Pure apart from filesystem probes; does not touch the network.
pub async fn decide(
    classifier: &PathClassifier,
    static_root: &Path,
    path: &str,
) -> Result<DispatchDecision, DispatchError> {
    if let Some(rewrite) = classifier.classify(path) {
        let target = rewrite.target_path();
        let Some(fs_path) = resolve_under(static_root, &target) else {
            return Err(DispatchError::RewriteTargetMissing { target });
        };
        return match probe::classify(&fs_path).await {
            Ok(PathKind::RegularFile) => Ok(DispatchDecision::StaticRewritten {
                path: target,
                fs_path,
            }),
            Ok(_) => Err(DispatchError::RewriteTargetMissing { target }),
            Err(source) => Err(DispatchError::Probe {
                path: fs_path,
                source,
            }),
        };
    }

    let Some(fs_path) = resolve_under(static_root, path) else {
        // Traversal attempts are never static files; the upstream applies
        // its own path handling.
        return Ok(DispatchDecision::Forward);
    };
    match probe::classify(&fs_path).await {
        Ok(PathKind::RegularFile) | Ok(PathKind::Directory) => {
            Ok(DispatchDecision::Static { fs_path })
        }
        Ok(PathKind::Missing) => Ok(DispatchDecision::Forward),
        Err(source) => Err(DispatchError::Probe {
            path: fs_path,
            source,
        }),
    }
}

/// Resolve a request path inside a static root, refusing anything that
/// could step outside it. Percent escapes are decoded first, so the probe
/// sees the same file the static file service would serve.
fn resolve_under(root: &Path, path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(path).ok()?;
    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            _ if segment.contains('\0') => return None,
            _ => resolved.push(segment),
        }
    }
    Some(resolved)
}

/// Serve a path from the static root, optionally under a rewritten name.
async fn serve_static(
    root: &Path,
    mut request: Request<Body>,
    rewritten: Option<String>,
) -> Response<Body> {
    if let Some(path) = rewritten {
        let mut parts = request.uri().clone().into_parts();
        parts.path_and_query = match path.parse::<PathAndQuery>() {
            Ok(pq) => Some(pq),
            Err(err) => {
                tracing::error!(target = %path, error = %err, "rewritten path is not a valid URI path");
                return StatusCode::NOT_FOUND.into_response();
            }
        };
        match Uri::from_parts(parts) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(err) => {
                tracing::error!(target = %path, error = %err, "rewritten path is not a valid URI path");
                return StatusCode::NOT_FOUND.into_response();
            }
        }
    }

    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(err) => {
            tracing::error!(error = %err, "static file service failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Forward a request to the route's upstream, through the redirect-
/// intercepting sink when the route takes part in response redirection.
async fn forward_route(
    state: &AppState,
    route: &Route,
    request: Request<Body>,
) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let (mut sink, body) = match &state.redirect {
        Some(policy) if route.internal_redirect => {
            // The signal may require replaying this request against the
            // secondary upstream, so the body has to be buffered up front;
            // a drained stream cannot be re-sent.
            let bytes = match axum::body::to_bytes(body, policy.max_replay_body_bytes).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        route = %route.name,
                        error = %err,
                        "request body cannot be buffered for replay"
                    );
                    return (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "Request body too large to replay",
                    )
                        .into_response();
                }
            };
            let replay = ReplayRequest {
                method: parts.method.clone(),
                headers: parts.headers.clone(),
                body: bytes.clone(),
            };
            (
                ResponseSink::armed(policy.clone(), state.client.clone(), replay),
                Body::from(bytes),
            )
        }
        _ => (ResponseSink::passthrough(), body),
    };

    let response = crate::http::forward::forward(
        &state.client,
        &route.upstream,
        parts.method.clone(),
        &parts.headers,
        &path_and_query,
        body,
    )
    .await;

    sink.commit(response).await;
    sink.into_response()
}

fn raw_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .map(|raw| String::from_utf8_lossy(raw.as_bytes()).into_owned())
        .unwrap_or_default()
}
