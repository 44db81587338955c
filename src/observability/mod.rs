//! Observability subsystem: structured logging via tracing.

pub mod logging;
