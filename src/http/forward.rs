//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Re-issue a client request against a backend origin
//! - Strip hop-by-hop headers on both legs
//! - Stream the backend response body without buffering
//!
//! # Design Decisions
//! - The original Host header is preserved toward the upstream, so backends
//!   can do their own virtual-host reasoning
//! - A connection failure is a 502; there is no retry policy
//! - An upstream error *response* passes through as-is; only transport
//!   failures are translated

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Method, Request, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use hyper_util::client::legacy::{connect::HttpConnector, Client};

/// Shared HTTP client used for all upstream calls.
pub type HttpClient = Client<HttpConnector, Body>;

/// Headers meaningful only for one leg of a proxied connection.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers before re-issuing on another leg.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Forward a request to an upstream and hand back its response.
///
/// Method, headers (minus hop-by-hop) and body pass through unchanged;
/// `path_and_query` replaces the path portion of the upstream URL.
pub async fn forward(
    client: &HttpClient,
    upstream: &Uri,
    method: Method,
    headers: &HeaderMap,
    path_and_query: &str,
    body: Body,
) -> Response<Body> {
    let uri = match upstream_uri(upstream, path_and_query) {
        Ok(uri) => uri,
        Err(err) => {
            tracing::error!(
                upstream = %upstream,
                path = %path_and_query,
                error = %err,
                "failed to build upstream URI"
            );
            return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
        }
    };

    let mut request = match Request::builder().method(method).uri(uri).body(body) {
        Ok(request) => request,
        Err(err) => {
            tracing::error!(upstream = %upstream, error = %err, "failed to build upstream request");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
        }
    };

    let outbound = request.headers_mut();
    for (name, value) in headers {
        outbound.append(name.clone(), value.clone());
    }
    strip_hop_by_hop(outbound);

    match client.request(request).await {
        Ok(response) => {
            let mut response = response.map(Body::new);
            strip_hop_by_hop(response.headers_mut());
            response
        }
        Err(err) => {
            tracing::error!(upstream = %upstream, error = %err, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Graft a request path onto an upstream base URL.
fn upstream_uri(upstream: &Uri, path_and_query: &str) -> Result<Uri, axum::http::Error> {
    let mut parts = upstream.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}
