//! Middleware layers: request tracing and in-process counters.

pub mod metrics;
pub mod tracing_layer;
