//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → dispatch.rs (virtual host + path → one terminal action)
//!     → forward.rs (upstream call) or tower-http ServeDir (static file)
//!     → sink.rs (redirect interception, single-commit guarantee)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod forward;
pub mod server;
pub mod sink;

pub use server::{AppState, HttpServer};
