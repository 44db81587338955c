//! Development front door.
//!
//! One HTTP listener fanning requests out to several independently-run
//! backend dev servers and a shared static file tree, routed by the Host
//! header and the request path.
//!
//! ```text
//!                        ┌──────────────────────────────────────────┐
//!                        │                FRONT DOOR                 │
//!   Client Request       │  ┌─────────┐   ┌──────────┐   ┌────────┐ │
//!   ─────────────────────┼─▶│  http   │──▶│ routing  │──▶│dispatch│ │
//!                        │  │ server  │   │host+path │   │decision│ │
//!                        │  └─────────┘   └──────────┘   └───┬────┘ │
//!                        │                                   │      │
//!                        │        ┌──────────────────────────┼────┐ │
//!                        │        ▼                          ▼    │ │
//!                        │  static file tree          upstream    │ │
//!                        │  (tower-http ServeDir)     forwarding  │ │
//!                        │        │                          │    │ │
//!   Client Response      │        └───────▶ response ◀───────┘    │ │
//!   ◀────────────────────┼────────────────── sink ────────────────┘ │
//!                        │         (redirect interception,          │
//!                        │          single-commit guarantee)        │
//!                        └──────────────────────────────────────────┘
//! ```
//!
//! A backend may answer with an internal redirect header instead of a real
//! body; the response sink then re-issues the original request against the
//! storage service and streams that response to the client instead. The
//! client never sees the indirection.

// Core subsystems
pub mod config;
pub mod fs;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::FrontDoorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
