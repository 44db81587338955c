//! Filesystem subsystem: existence probing for static file dispatch.

pub mod probe;

pub use probe::{classify, PathKind};
