//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the route table and redirect policy from configuration
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (request tracing)
//! - Serve connections until shutdown is triggered

use axum::{body::Body, extract::State, http::Request, response::Response, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::validation::ValidationError;
use crate::config::FrontDoorConfig;
use crate::http::dispatch;
use crate::http::forward::HttpClient;
use crate::http::sink::RedirectPolicy;
use crate::lifecycle::Shutdown;
use crate::routing::rewrite::PathClassifier;
use crate::routing::router::RouteTable;

/// Application state injected into the dispatch handler. Everything here is
/// immutable after startup and shared read-only across requests.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub classifier: Arc<PathClassifier>,
    pub client: HttpClient,
    pub redirect: Option<Arc<RedirectPolicy>>,
}

/// HTTP server for the front door.
pub struct HttpServer {
    router: Router,
    config: FrontDoorConfig,
}

impl HttpServer {
    /// Compile the configuration and build the server.
    pub fn new(config: FrontDoorConfig) -> Result<Self, Vec<ValidationError>> {
        let table = Arc::new(RouteTable::from_config(&config.routes)?);
        let redirect = RedirectPolicy::from_config(&config.redirect)?.map(Arc::new);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            table,
            classifier: Arc::new(PathClassifier::new()),
            client,
            redirect,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router. Every path on every method goes through the
    /// same dispatch handler; routing happens on the Host header, not here.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(front_door_handler))
            .route("/", any(front_door_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown coordinator fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "front door starting"
        );
        for route in &self.config.routes {
            tracing::info!(
                route = %route.name,
                host = %route.host,
                upstream = %route.upstream,
                static_root = ?route.static_root,
                "route registered"
            );
        }

        let mut rx = shutdown.subscribe();
        let wait = async move {
            // Hold a sender so the channel cannot close while serving.
            let _shutdown = shutdown;
            let _ = rx.recv().await;
            tracing::info!("shutdown signal received");
        };

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(wait)
            .await?;

        tracing::info!("front door stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FrontDoorConfig {
        &self.config
    }
}

/// Catch-all handler: every request goes through the dispatcher.
async fn front_door_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    dispatch::handle(state, request).await
}
