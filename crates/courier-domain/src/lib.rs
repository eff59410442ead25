//! Domain types shared across all Courier services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never in `infra/` or `handlers/`.

pub mod channel;
pub mod error;
pub mod id;
pub mod message;
pub mod profile;
pub mod sender;
