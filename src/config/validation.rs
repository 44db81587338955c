//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check virtual hosts are unique and upstream addresses resolve to URLs
//! - Check configured static roots actually are directories
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config plus one startup-time
//!   filesystem check per static root
//! - Runs before config is accepted into the system; a config that passes
//!   never produces a startup panic later

use axum::http::header::HeaderName;
use axum::http::Uri;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::schema::FrontDoorConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Two routes claim the same virtual host.
    #[error("route {route}: host {host:?} is already taken by another route")]
    DuplicateHost { route: String, host: String },

    /// A route's host is empty or contains a port/path.
    #[error("route {route}: host {host:?} must be a bare hostname")]
    InvalidHost { route: String, host: String },

    /// An upstream address could not be turned into a URL.
    #[error("route {route}: invalid upstream address {addr:?}: {reason}")]
    InvalidUpstream {
        route: String,
        addr: String,
        reason: String,
    },

    /// A configured static root does not exist or is not a directory.
    #[error("route {route}: static root {path:?} is not a directory")]
    StaticRootNotADirectory { route: String, path: PathBuf },

    /// The redirect header name is not a valid HTTP header name.
    #[error("redirect header {header:?} is not a valid header name")]
    InvalidRedirectHeader { header: String },

    /// The redirect prefix must be an absolute path.
    #[error("redirect prefix {prefix:?} must start with '/'")]
    InvalidRedirectPrefix { prefix: String },

    /// The redirect upstream address could not be turned into a URL.
    #[error("invalid redirect upstream address {addr:?}: {reason}")]
    InvalidRedirectUpstream { addr: String, reason: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FrontDoorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut hosts = HashSet::new();

    for route in &config.routes {
        if route.host.is_empty() || route.host.contains(':') || route.host.contains('/') {
            errors.push(ValidationError::InvalidHost {
                route: route.name.clone(),
                host: route.host.clone(),
            });
        } else if !hosts.insert(route.host.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateHost {
                route: route.name.clone(),
                host: route.host.clone(),
            });
        }

        if let Err(reason) = normalize_upstream(&route.upstream) {
            errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                addr: route.upstream.clone(),
                reason,
            });
        }

        if let Some(root) = &route.static_root {
            if !root.is_dir() {
                errors.push(ValidationError::StaticRootNotADirectory {
                    route: route.name.clone(),
                    path: root.clone(),
                });
            }
        }
    }

    if config.redirect.enabled {
        if HeaderName::from_bytes(config.redirect.header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidRedirectHeader {
                header: config.redirect.header.clone(),
            });
        }
        if !config.redirect.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRedirectPrefix {
                prefix: config.redirect.prefix.clone(),
            });
        }
        if let Err(reason) = normalize_upstream(&config.redirect.upstream) {
            errors.push(ValidationError::InvalidRedirectUpstream {
                addr: config.redirect.upstream.clone(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Turn a configured upstream address into a base URL.
///
/// Accepts a full "http://host:port" URL or a bare "host:port" pair, where
/// an empty host means localhost. So ":3000", "localhost:3000" and
/// "http://localhost:3000" all name the same upstream.
pub fn normalize_upstream(addr: &str) -> Result<Uri, String> {
    let url = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| "expected host:port or a full URL".to_string())?;
        if port.is_empty() || port.parse::<u16>().is_err() {
            return Err(format!("invalid port {port:?}"));
        }
        let host = if host.is_empty() { "localhost" } else { host };
        format!("http://{host}:{port}")
    };

    let uri: Uri = url.parse().map_err(|e| format!("{e}"))?;
    if uri.authority().is_none() {
        return Err("missing authority".to_string());
    }
    Ok(uri)
}
