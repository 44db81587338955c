//! Shared utilities for integration testing.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use front_door::config::{FrontDoorConfig, RedirectConfig, RouteConfig};
use front_door::http::HttpServer;
use front_door::lifecycle::Shutdown;

/// One request observed by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Requests observed by a mock backend, in arrival order.
#[derive(Debug, Default)]
pub struct Recorded {
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Recorded {
    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Response<Body> + Send + Sync>;

#[derive(Clone)]
struct MockState {
    recorded: Arc<Recorded>,
    respond: Responder,
}

/// Start a mock backend on an ephemeral port. It records every request it
/// sees and answers with the given responder.
pub async fn start_backend<F>(respond: F) -> (SocketAddr, Arc<Recorded>)
where
    F: Fn(&RecordedRequest) -> Response<Body> + Send + Sync + 'static,
{
    let recorded = Arc::new(Recorded::default());
    let state = MockState {
        recorded: recorded.clone(),
        respond: Arc::new(respond),
    };
    let app = Router::new()
        .route("/", any(record))
        .route("/{*path}", any(record))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorded)
}

async fn record(State(state): State<MockState>, request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let observed = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: bytes.to_vec(),
    };
    let response = (state.respond)(&observed);
    state.recorded.requests.lock().unwrap().push(observed);
    response
}

/// A plain text response for mock backends.
pub fn text_response(status: StatusCode, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Route config pointing at a mock backend.
pub fn route(
    name: &str,
    host: &str,
    upstream: SocketAddr,
    static_root: Option<&Path>,
) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        host: host.to_string(),
        upstream: upstream.to_string(),
        static_root: static_root.map(|p| p.to_path_buf()),
        internal_redirect: true,
    }
}

/// A redirect config with the mechanism switched off.
pub fn no_redirect() -> RedirectConfig {
    RedirectConfig {
        enabled: false,
        ..RedirectConfig::default()
    }
}

/// A redirect config pointing at a mock storage backend.
pub fn redirect_to(upstream: SocketAddr) -> RedirectConfig {
    RedirectConfig {
        upstream: upstream.to_string(),
        ..RedirectConfig::default()
    }
}

pub fn config_with(routes: Vec<RouteConfig>, redirect: RedirectConfig) -> FrontDoorConfig {
    FrontDoorConfig {
        routes,
        redirect,
        ..FrontDoorConfig::default()
    }
}

/// Start the front door on an ephemeral port.
pub async fn start_front_door(config: FrontDoorConfig) -> SocketAddr {
    start_front_door_with_shutdown(config, Shutdown::new()).await
}

/// Start the front door with an externally controlled shutdown coordinator.
pub async fn start_front_door_with_shutdown(
    config: FrontDoorConfig,
    shutdown: Shutdown,
) -> SocketAddr {
    let server = HttpServer::new(config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server.run(listener, shutdown).await.unwrap();
    });
    addr
}

/// A client whose DNS resolves `host` to the front door, so requests carry
/// a real virtual-host Host header without touching actual DNS.
pub fn client_for(host: &str, front_door: SocketAddr) -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .resolve(host, front_door)
        .build()
        .unwrap()
}

pub fn host_url(host: &str, front_door: SocketAddr, path: &str) -> String {
    format!("http://{host}:{port}{path}", port = front_door.port())
}
