//! Redirect-intercepting response sink.
//!
//! A backend can answer "serve this from the storage service instead" by
//! setting a designated response header instead of a real body. From the
//! dispatcher's point of view that reply looks like any other response, so
//! the substitution has to happen at the point where a response would be
//! committed to the client: the sink inspects the header there, and when it
//! carries a recognized target, throws the pending response away and
//! forwards the *original* request to the secondary upstream instead. The
//! client only ever sees one response and never the internal signal.
//!
//! # State machine
//! ```text
//! Armed ──(signal recognized)──▶ Redirecting ──▶ Committed
//!   │                                              ▲
//!   └──────────────(plain commit)──────────────────┘
//! ```
//! A commit after Committed is a backend/dispatch bug: logged, dropped, the
//! first committed response always wins.

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderName};
use axum::http::{Method, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::config::schema::RedirectConfig;
use crate::config::validation::{normalize_upstream, ValidationError};
use crate::http::forward::{forward, HttpClient};

/// Compiled redirect convention: which header to watch, which path prefix
/// claims the secondary upstream, and where that upstream lives.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    pub header: HeaderName,
    pub prefix: String,
    pub upstream: Uri,
    pub max_replay_body_bytes: usize,
}

impl RedirectPolicy {
    /// Compile the redirect configuration. `None` means the mechanism is
    /// disabled entirely.
    pub fn from_config(config: &RedirectConfig) -> Result<Option<Self>, Vec<ValidationError>> {
        if !config.enabled {
            return Ok(None);
        }

        let mut errors = Vec::new();

        let header = match HeaderName::from_bytes(config.header.as_bytes()) {
            Ok(header) => Some(header),
            Err(_) => {
                errors.push(ValidationError::InvalidRedirectHeader {
                    header: config.header.clone(),
                });
                None
            }
        };
        if !config.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRedirectPrefix {
                prefix: config.prefix.clone(),
            });
        }
        let upstream = match normalize_upstream(&config.upstream) {
            Ok(upstream) => Some(upstream),
            Err(reason) => {
                errors.push(ValidationError::InvalidRedirectUpstream {
                    addr: config.upstream.clone(),
                    reason,
                });
                None
            }
        };

        match (header, upstream) {
            (Some(header), Some(upstream)) if errors.is_empty() => Ok(Some(Self {
                header,
                prefix: config.prefix.clone(),
                upstream,
                max_replay_body_bytes: config.max_replay_body_bytes,
            })),
            _ => Err(errors),
        }
    }
}

/// The buffered essence of the original request, kept so it can be replayed
/// against the secondary upstream once the primary response is discarded.
#[derive(Debug, Clone)]
pub struct ReplayRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    /// Nothing committed yet; a redirect signal may still fire.
    Armed,
    /// A recognized signal is being substituted by a secondary call.
    Redirecting,
    /// A response has been handed to the client.
    Committed,
}

/// Per-request response sink. Guarantees that exactly one response reaches
/// the client, and intercepts the redirect signal before anything is
/// written.
pub struct ResponseSink {
    state: SinkState,
    redirect: Option<RedirectContext>,
    committed: Option<Response<Body>>,
}

struct RedirectContext {
    policy: Arc<RedirectPolicy>,
    client: HttpClient,
    replay: ReplayRequest,
}

enum Signal {
    Absent,
    /// Header present but the target is outside the recognized prefix.
    Foreign(String),
    /// Header present with a recognized target path.
    Target(String),
}

impl ResponseSink {
    /// A sink that never redirects (static serving, routes with the
    /// mechanism disabled).
    pub fn passthrough() -> Self {
        Self {
            state: SinkState::Armed,
            redirect: None,
            committed: None,
        }
    }

    /// A sink that watches the first committed response for the redirect
    /// signal and substitutes a secondary upstream call when it fires.
    pub fn armed(policy: Arc<RedirectPolicy>, client: HttpClient, replay: ReplayRequest) -> Self {
        Self {
            state: SinkState::Armed,
            redirect: Some(RedirectContext {
                policy,
                client,
                replay,
            }),
            committed: None,
        }
    }

    /// Commit a response toward the client. The first commit wins; a later
    /// commit is logged as a bug and dropped.
    pub async fn commit(&mut self, mut response: Response<Body>) {
        if self.state != SinkState::Armed {
            tracing::error!(
                status = %response.status(),
                "response already committed, dropping second response"
            );
            return;
        }

        match self.signal(&response) {
            Signal::Absent => {}
            Signal::Foreign(value) => {
                if let Some(ctx) = &self.redirect {
                    // An internal signal, even an unrecognized one, must not
                    // leak to the client.
                    tracing::warn!(
                        header = %ctx.policy.header,
                        value = %value,
                        "redirect target outside the recognized prefix, ignoring"
                    );
                    response.headers_mut().remove(&ctx.policy.header);
                }
            }
            Signal::Target(path) => {
                if let Some(ctx) = self.redirect.take() {
                    self.state = SinkState::Redirecting;
                    tracing::debug!(
                        target = %path,
                        upstream = %ctx.policy.upstream,
                        "substituting response from secondary upstream"
                    );
                    // The pending response, its body-framing headers and the
                    // signal itself all describe the discarded reply.
                    drop(response);
                    let substituted = forward(
                        &ctx.client,
                        &ctx.policy.upstream,
                        ctx.replay.method.clone(),
                        &ctx.replay.headers,
                        &path,
                        Body::from(ctx.replay.body.clone()),
                    )
                    .await;
                    // Committed verbatim. The signal is only honored from
                    // Armed, so redirects cannot chain.
                    self.state = SinkState::Committed;
                    self.committed = Some(substituted);
                    return;
                }
            }
        }

        self.state = SinkState::Committed;
        self.committed = Some(response);
    }

    fn signal(&self, response: &Response<Body>) -> Signal {
        let Some(ctx) = &self.redirect else {
            return Signal::Absent;
        };
        let Some(raw) = response.headers().get(&ctx.policy.header) else {
            return Signal::Absent;
        };
        let Ok(value) = raw.to_str() else {
            return Signal::Foreign(format!("{raw:?}"));
        };
        match parse_target(&ctx.policy.prefix, value) {
            Some(path) => Signal::Target(path),
            None => Signal::Foreign(value.to_string()),
        }
    }

    /// The response that reaches the client.
    pub fn into_response(self) -> Response<Body> {
        match self.committed {
            Some(response) => response,
            None => {
                tracing::error!("no response was committed for this request");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Extract the secondary-upstream path from a redirect header value.
///
/// The prefix must cover a whole path segment: "/storage/a/b.jpg" with
/// prefix "/storage" yields "/a/b.jpg", but "/storages/x" is not a match.
fn parse_target(prefix: &str, value: &str) -> Option<String> {
    match value.strip_prefix(prefix)? {
        "" => Some("/".to_string()),
        rest if rest.starts_with('/') => Some(rest.to_string()),
        _ => None,
    }
}
