//! Request middleware: Prometheus instrumentation.

pub mod metrics;
