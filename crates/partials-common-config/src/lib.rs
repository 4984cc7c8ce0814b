//! Configuration types for partials.
//!
//! This crate provides the configuration read from `.partials/config.yaml`,
//! with `.env` file loading, `${VAR}` expansion and `PARTIALS_*` environment
//! overrides.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
