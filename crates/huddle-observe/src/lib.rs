//! Observability setup for Huddle binaries.

pub mod tracing_setup;
