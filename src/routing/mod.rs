//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (virtual-host lookup)
//!     → rewrite.rs (legacy asset path classification)
//!     → Return: matched Route / rewritten path / explicit no-match
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Normalize upstream addresses into URLs
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Host lookup is an exact, case-insensitive hostname match
//! - Rewrite rules are anchored regexes with typed captures
//! - Deterministic: same input always matches same route

pub mod rewrite;
pub mod router;

pub use rewrite::{AssetRewrite, PathClassifier};
pub use router::{HostError, Route, RouteTable};
