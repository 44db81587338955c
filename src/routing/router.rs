//! Route lookup by virtual host.
//!
//! # Responsibilities
//! - Compile routes from configuration into an immutable table
//! - Extract the hostname from the Host header (port stripped)
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap, keyed by lowercased hostname
//! - A malformed Host header is an error, never a guessed backend;
//!   misrouting a request in a dev proxy is worse than failing loudly

use axum::http::header::{self, HeaderMap};
use axum::http::uri::Authority;
use axum::http::Uri;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::schema::RouteConfig;
use crate::config::validation::{normalize_upstream, ValidationError};

/// A compiled route: one virtual host, one upstream, optionally a static
/// file tree served in front of it.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier for logging.
    pub name: String,

    /// Base URL requests are forwarded to.
    pub upstream: Uri,

    /// Directory served directly for paths that exist on disk.
    pub static_root: Option<PathBuf>,

    /// Whether responses on this route may trigger internal redirection.
    pub internal_redirect: bool,
}

/// Why a request's virtual host could not be determined.
#[derive(Debug, Error)]
pub enum HostError {
    /// The request carried no Host header and no URI authority.
    #[error("request has no Host header")]
    Missing,

    /// The Host header value was not a parsable authority.
    #[error("malformed Host header: {0:?}")]
    Malformed(String),
}

/// Immutable virtual-host routing table, built once at startup and shared
/// read-only across all in-flight requests.
#[derive(Debug)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    /// Compile the configured routes.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, Vec<ValidationError>> {
        let mut routes = HashMap::new();
        let mut errors = Vec::new();

        for config in configs {
            match normalize_upstream(&config.upstream) {
                Ok(upstream) => {
                    let route = Route {
                        name: config.name.clone(),
                        upstream,
                        static_root: config.static_root.clone(),
                        internal_redirect: config.internal_redirect,
                    };
                    if routes.insert(config.host.to_ascii_lowercase(), route).is_some() {
                        errors.push(ValidationError::DuplicateHost {
                            route: config.name.clone(),
                            host: config.host.clone(),
                        });
                    }
                }
                Err(reason) => {
                    errors.push(ValidationError::InvalidUpstream {
                        route: config.name.clone(),
                        addr: config.upstream.clone(),
                        reason,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(Self { routes })
        } else {
            Err(errors)
        }
    }

    /// Resolve a request's virtual host to a route.
    ///
    /// The hostname comes from the Host header (HTTP/1.1) or the request
    /// URI's authority (HTTP/2), with any port stripped and compared
    /// case-insensitively. `Ok(None)` means the host parsed fine but no
    /// route answers for it.
    pub fn resolve(&self, uri: &Uri, headers: &HeaderMap) -> Result<Option<&Route>, HostError> {
        let hostname = match headers.get(header::HOST) {
            Some(raw) => {
                let value = raw
                    .to_str()
                    .map_err(|_| HostError::Malformed(format!("{raw:?}")))?;
                let authority: Authority = value
                    .parse()
                    .map_err(|_| HostError::Malformed(value.to_string()))?;
                authority.host().to_ascii_lowercase()
            }
            None => uri
                .host()
                .map(str::to_ascii_lowercase)
                .ok_or(HostError::Missing)?,
        };

        Ok(self.routes.get(&hostname))
    }

    /// Number of compiled routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over compiled routes (for startup logging).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(host, route)| (host.as_str(), route))
    }
}
