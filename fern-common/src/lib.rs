//! Shared utilities for the Fern workspace.
//!
//! Currently this is just the [`observability`] module, which centralises
//! `tracing` setup so that every binary and integration-test harness emits
//! into the same rolling file sink. The crate is intentionally lightweight
//! so that all crates can depend on it without heavy transitive costs.
pub mod observability;
