//! Test utilities: schema fixtures and raw mutation encoders.
//!
//! Gated behind the `test-utils` feature; integration tests enable it through
//! the crate's self dev-dependency.

pub mod mutations;
pub mod schema;
