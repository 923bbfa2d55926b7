//! Telemetry setup shared by the fastmerge binaries and tests.

pub mod tracing;
