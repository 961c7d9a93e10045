//! Synthetic urban tree dataset generation
//!
//! Re-exports modules for use by the CLI binary and tests.

pub mod boundaries;
pub mod codes;
pub mod dataset;
pub mod record;
pub mod reference;
pub mod sampling;
