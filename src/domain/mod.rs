//! Domain layer types and invariants.

pub mod assets;
pub mod entities;
pub mod error;
pub mod filters;
