//! Storage seam for the core services.
//!
//! Domain services only see the async traits in [`ports`]. Adapters live
//! under [`infrastructure`]: an in-memory store used by tests and tooling,
//! and the PostgreSQL repositories behind the `database` feature.

pub mod infrastructure;
pub mod ports;
