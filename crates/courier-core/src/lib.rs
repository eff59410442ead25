//! Shared infrastructure for courier services: failure classification,
//! the versioned document model and its store port, tracing and health.

pub mod env;
pub mod error;
pub mod health;
pub mod memory;
pub mod serde;
pub mod store;
pub mod tracing;
pub mod versioned;
