//! Utility modules shared across the crate.
//!
//! Currently this only holds the error taxonomy.

pub mod errors;

// Re-exports
pub use errors::*;
