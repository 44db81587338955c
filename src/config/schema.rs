//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the front
//! door. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the front door.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontDoorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping virtual hosts to backends.
    pub routes: Vec<RouteConfig>,

    /// Internal response-redirection settings.
    pub redirect: RedirectConfig,
}

impl Default for FrontDoorConfig {
    fn default() -> Self {
        // The local dev topology: the MAP shop app with its public tree,
        // the editor app, and the storage service, all on localhost.
        Self {
            listener: ListenerConfig::default(),
            routes: vec![
                RouteConfig {
                    name: "map".to_string(),
                    host: "map.dev".to_string(),
                    upstream: ":3000".to_string(),
                    static_root: Some(PathBuf::from("../map/public")),
                    internal_redirect: true,
                },
                RouteConfig {
                    name: "editor".to_string(),
                    host: "editor.dev".to_string(),
                    upstream: ":4000".to_string(),
                    static_root: None,
                    internal_redirect: true,
                },
                RouteConfig {
                    name: "storage".to_string(),
                    host: "storage.dev".to_string(),
                    upstream: ":5000".to_string(),
                    static_root: None,
                    internal_redirect: false,
                },
            ],
            redirect: RedirectConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Route configuration mapping a virtual host to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Virtual host this route answers for (hostname only, no port).
    pub host: String,

    /// Upstream address. Either a full URL ("http://127.0.0.1:3000") or a
    /// "host:port" pair; an empty host defaults to localhost, so ":3000"
    /// means "http://localhost:3000".
    pub upstream: String,

    /// Directory served directly for paths that resolve to files on disk.
    /// Routes without one forward everything to the upstream.
    #[serde(default)]
    pub static_root: Option<PathBuf>,

    /// Whether backend responses on this route may carry the internal
    /// redirect header (see [`RedirectConfig`]).
    #[serde(default = "default_internal_redirect")]
    pub internal_redirect: bool,
}

fn default_internal_redirect() -> bool {
    true
}

/// Internal response-redirection configuration.
///
/// A backend signals "serve this from the storage service instead" by
/// setting `header` on its response to a path starting with `prefix`. The
/// front door then re-issues the original request against `upstream`, with
/// the remainder of the header value as the path, and streams that response
/// to the client instead. The client never sees the indirection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Enable response redirection.
    pub enabled: bool,

    /// Response header carrying the redirect target.
    pub header: String,

    /// Path prefix designating the secondary upstream.
    pub prefix: String,

    /// Secondary upstream address, same syntax as route upstreams.
    pub upstream: String,

    /// Largest request body buffered for replay against the secondary
    /// upstream. Bigger bodies are rejected before any upstream call, since
    /// a drained body stream cannot be re-sent.
    pub max_replay_body_bytes: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: "x-internal-redirect".to_string(),
            prefix: "/storage".to_string(),
            upstream: ":5000".to_string(),
            max_replay_body_bytes: 32 * 1024 * 1024,
        }
    }
}
