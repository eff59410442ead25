//! Test support shared by courier crates. Only used from `[dev-dependencies]`.

pub mod fixture;
pub mod store;
