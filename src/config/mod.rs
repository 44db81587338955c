//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, fail-fast on bad roots/upstreams)
//!     → FrontDoorConfig (validated, immutable)
//!     → compiled into the route table at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults describing the local dev topology
//! - Validation separates syntactic (serde) from semantic checks
//! - Misconfiguration fails startup; it never surfaces per-request

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::FrontDoorConfig;
pub use schema::ListenerConfig;
pub use schema::RedirectConfig;
pub use schema::RouteConfig;
pub use validation::{normalize_upstream, validate_config, ValidationError};
