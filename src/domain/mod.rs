//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod publication;
pub mod subscribers;
pub mod types;
